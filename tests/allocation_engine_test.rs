// ==========================================
// 分配引擎集成测试
// ==========================================
// 职责: 验证求解性质（可行/不可行边界、确定性、求解器可替换）
// ==========================================


#[cfg(test)]
mod allocation_engine_test {
    use relief_allocation::api::AllocationApi;
    use relief_allocation::config::{defaults, AllocationConfig};
    use relief_allocation::domain::{
        quantities, AllocationRequest, AllocationResult, AllocationStatus, ResourcePlan,
        ResourceType, SeverityLevel,
    };
    use relief_allocation::engine::{
        AllocationEngine, AllocationProblem, AllocationSolver, FeasibilitySolver,
    };
    use relief_allocation::logging;
    use relief_allocation::repository::LedgerStore;
    use std::sync::Arc;

    use crate::test_helpers::create_json_store;

    // ==========================================
    // 参考求解器: 在需求下限附近的有界盒内穷举
    // ==========================================
    struct BruteForceSolver {
        slack: i64,
    }

    impl AllocationSolver for BruteForceSolver {
        fn name(&self) -> &'static str {
            "brute_force"
        }

        fn solve(&self, problem: &AllocationProblem) -> AllocationResult {
            let floor = |r: ResourceType| problem.demand.get(&r).copied().unwrap_or(0);
            let mut best: Option<(f64, ResourcePlan)> = None;

            for df in 0..=self.slack {
                for dm in 0..=self.slack {
                    for ds in 0..=self.slack {
                        let plan = quantities(
                            floor(ResourceType::FoodKits) + df,
                            floor(ResourceType::MedicalUnits) + dm,
                            floor(ResourceType::Shelters) + ds,
                        );
                        let cost = problem.cost_of(&plan);
                        if cost > problem.budget {
                            continue;
                        }
                        if best.as_ref().map_or(true, |(c, _)| cost < *c) {
                            best = Some((cost, plan));
                        }
                    }
                }
            }

            match best {
                Some((cost, plan)) => {
                    AllocationResult::optimal(problem.severity, problem.budget, plan, cost)
                }
                None => AllocationResult::infeasible(
                    problem.severity,
                    problem.budget,
                    problem.minimum_required(),
                ),
            }
        }
    }

    fn engine() -> AllocationEngine {
        AllocationEngine::new(Arc::new(AllocationConfig::default()))
    }

    fn minimum_required(level: SeverityLevel) -> f64 {
        AllocationConfig::default().minimum_required(level).unwrap()
    }

    // ==========================================
    // 可行性边界
    // ==========================================

    #[test]
    fn test_sufficient_budget_returns_demand_floor() {
        logging::init_test();
        let engine = engine();

        for level in SeverityLevel::ALL {
            let min = minimum_required(level);
            for budget in [min, min + 1.0, min * 2.0, defaults::default_budget(level)] {
                let result = engine
                    .solve(&AllocationRequest::new(level).with_budget(budget))
                    .unwrap();

                assert_eq!(result.status, AllocationStatus::Optimal, "{} @ {}", level, budget);
                assert_eq!(result.plan, Some(defaults::demand(level)));
                assert_eq!(result.total_cost, Some(min));
                assert_eq!(result.budget, budget);
            }
        }
    }

    #[test]
    fn test_insufficient_budget_reports_minimum_required() {
        let engine = engine();

        for level in SeverityLevel::ALL {
            let min = minimum_required(level);
            for budget in [min - 1.0, min / 2.0, 1.0] {
                let result = engine
                    .solve(&AllocationRequest::new(level).with_budget(budget))
                    .unwrap();

                assert_eq!(result.status, AllocationStatus::Infeasible, "{} @ {}", level, budget);
                assert_eq!(result.plan, None);
                assert_eq!(result.total_cost, None);
                assert_eq!(result.minimum_required, Some(min));
            }
        }
    }

    #[test]
    fn test_catalog_minimums() {
        assert_eq!(minimum_required(SeverityLevel::Low), 59_000.0);
        assert_eq!(minimum_required(SeverityLevel::Medium), 454_000.0);
        assert_eq!(minimum_required(SeverityLevel::High), 2_750_000.0);
    }

    #[test]
    fn test_default_budgets_are_feasible() {
        let engine = engine();
        for level in SeverityLevel::ALL {
            let result = engine.solve(&AllocationRequest::new(level)).unwrap();
            assert!(result.is_optimal(), "default budget for {} should cover the floor", level);
            assert_eq!(result.budget, defaults::default_budget(level));
        }
    }

    #[test]
    fn test_solve_is_deterministic() {
        let engine = engine();
        let request = AllocationRequest::new(SeverityLevel::Medium).with_budget(470_000.0);

        let first = engine.solve(&request).unwrap();
        for _ in 0..10 {
            assert_eq!(engine.solve(&request).unwrap(), first);
        }
    }

    // ==========================================
    // 求解器可替换性
    // ==========================================

    #[test]
    fn test_brute_force_solver_matches_closed_form() {
        let config = Arc::new(AllocationConfig::default());
        let closed_form = AllocationEngine::with_solver(Arc::clone(&config), Arc::new(FeasibilitySolver));
        let brute_force =
            AllocationEngine::with_solver(Arc::clone(&config), Arc::new(BruteForceSolver { slack: 2 }));
        assert_ne!(closed_form.solver_name(), brute_force.solver_name());

        let mut requests = Vec::new();
        for level in SeverityLevel::ALL {
            let min = minimum_required(level);
            requests.push(AllocationRequest::new(level));
            for budget in [1.0, min - 1.0, min, min + 0.5, min * 3.0] {
                requests.push(AllocationRequest::new(level).with_budget(budget));
            }
        }
        requests.push(
            AllocationRequest::new(SeverityLevel::Low)
                .with_budget(1_000.0)
                .with_demand_override(quantities(10, 1, 1)),
        );
        requests.push(
            AllocationRequest::new(SeverityLevel::High)
                .with_budget(100.0)
                .with_demand_override(quantities(0, 0, 0)),
        );

        for request in &requests {
            assert_eq!(
                closed_form.solve(request).unwrap(),
                brute_force.solve(request).unwrap(),
                "request: {:?}",
                request
            );
        }
    }

    #[test]
    fn test_custom_cost_table_changes_minimum() {
        let mut config = AllocationConfig::default();
        config.costs.insert(ResourceType::Shelters, 100.0);
        let engine = AllocationEngine::new(Arc::new(config));

        // 500*10 + 20*200 + 100*100 = 19000
        let result = engine
            .solve(&AllocationRequest::new(SeverityLevel::Low).with_budget(20_000.0))
            .unwrap();
        assert!(result.is_optimal());
        assert_eq!(result.total_cost, Some(19_000.0));
    }

    // ==========================================
    // 求解不触碰台账
    // ==========================================

    #[test]
    fn test_preview_leaves_ledger_untouched() {
        let (_dir, path, store) = create_json_store().unwrap();
        let before = std::fs::read(&path).unwrap();

        let store = Arc::new(store);
        let api = AllocationApi::new(Arc::new(engine()), store.clone());
        for level in SeverityLevel::ALL {
            api.preview(&AllocationRequest::new(level)).unwrap();
            api.preview(&AllocationRequest::new(level).with_budget(1.0)).unwrap();
        }

        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert!(store.history().unwrap().is_empty());
    }
}
