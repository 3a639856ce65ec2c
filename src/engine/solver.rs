// ==========================================
// 灾害救援物资分配引擎 - 资源分配求解器
// ==========================================
// 模型:
//   min  Σ cost[r] * x[r]
//   s.t. x[r] >= demand[r]
//        Σ cost[r] * x[r] <= budget
// 目标函数对每个 x[r] 单调递增,最优解(若存在)恒为 x = demand,
// 因此默认求解器为闭式可行性判定；保留 AllocationSolver 边界以便替换
// ==========================================
// 纯函数: 不读写台账与历史
// ==========================================

use crate::config::{minimum_cost, AllocationConfig, CostTable};
use crate::domain::allocation::{AllocationRequest, AllocationResult, ResourcePlan};
use crate::domain::types::{ResourceQuantities, ResourceType, SeverityLevel};
use crate::engine::error::ValidationError;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// AllocationProblem - 已解析的求解输入
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationProblem {
    pub severity: SeverityLevel,
    /// 需求下限（覆盖全部资源类型）
    pub demand: ResourceQuantities,
    pub costs: CostTable,
    pub budget: f64,
}

impl AllocationProblem {
    /// Σ cost[r] * demand[r]
    pub fn minimum_required(&self) -> f64 {
        minimum_cost(&self.costs, &self.demand)
    }

    /// 方案总成本
    pub fn cost_of(&self, plan: &ResourcePlan) -> f64 {
        minimum_cost(&self.costs, plan)
    }
}

// ==========================================
// AllocationSolver - 求解器边界
// ==========================================

/// 分配求解器 Trait
///
/// 任何实现在固定三类资源的模型上必须与 `FeasibilitySolver` 给出相同结果
pub trait AllocationSolver: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(&self, problem: &AllocationProblem) -> AllocationResult;
}

/// 闭式可行性求解器（默认）
#[derive(Debug, Clone, Copy, Default)]
pub struct FeasibilitySolver;

impl AllocationSolver for FeasibilitySolver {
    fn name(&self) -> &'static str {
        "closed_form_feasibility"
    }

    fn solve(&self, problem: &AllocationProblem) -> AllocationResult {
        let minimum_required = problem.minimum_required();

        if minimum_required <= problem.budget {
            AllocationResult::optimal(
                problem.severity,
                problem.budget,
                problem.demand.clone(),
                minimum_required,
            )
        } else {
            AllocationResult::infeasible(problem.severity, problem.budget, minimum_required)
        }
    }
}

// ==========================================
// AllocationEngine - 分配引擎
// ==========================================
pub struct AllocationEngine {
    config: Arc<AllocationConfig>,
    solver: Arc<dyn AllocationSolver>,
}

impl AllocationEngine {
    /// 使用默认闭式求解器
    pub fn new(config: Arc<AllocationConfig>) -> Self {
        Self::with_solver(config, Arc::new(FeasibilitySolver))
    }

    pub fn with_solver(config: Arc<AllocationConfig>, solver: Arc<dyn AllocationSolver>) -> Self {
        Self { config, solver }
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    pub fn solver_name(&self) -> &'static str {
        self.solver.name()
    }

    /// 解析求解输入
    ///
    /// 规则:
    /// 1) 等级必须存在于目录 → 否则 UnknownSeverity
    /// 2) 预算 = 请求值(必须 > 0) 或 目录默认预算
    /// 3) 需求 = 覆写值(整体替换,缺失资源为 0) 或 目录下限
    pub fn resolve(&self, request: &AllocationRequest) -> Result<AllocationProblem, ValidationError> {
        let profile = self
            .config
            .profile(request.severity)
            .ok_or_else(|| ValidationError::UnknownSeverity(request.severity.to_string()))?;

        let budget = match request.budget {
            Some(b) if b.is_finite() && b > 0.0 => b,
            Some(b) => return Err(ValidationError::InvalidBudget(b)),
            None => profile.default_budget,
        };

        let source = request.demand_override.as_ref().unwrap_or(&profile.demand);
        let mut demand = ResourceQuantities::new();
        for resource in ResourceType::ALL {
            let quantity = source.get(&resource).copied().unwrap_or(0);
            if quantity < 0 {
                return Err(ValidationError::InvalidDemand { resource, quantity });
            }
            demand.insert(resource, quantity);
        }

        Ok(AllocationProblem {
            severity: request.severity,
            demand,
            costs: self.config.costs.clone(),
            budget,
        })
    }

    /// 求解分配
    ///
    /// # 返回
    /// - Ok(AllocationResult): Optimal 或 Infeasible（不可行不是错误）
    /// - Err(ValidationError): 输入非法,未进行任何计算
    #[instrument(skip(self, request), fields(
        severity = %request.severity,
        budget = ?request.budget,
        solver = self.solver.name()
    ))]
    pub fn solve(&self, request: &AllocationRequest) -> Result<AllocationResult, ValidationError> {
        let problem = self.resolve(request)?;
        let result = self.solver.solve(&problem);

        tracing::debug!(
            status = ?result.status,
            total_cost = ?result.total_cost,
            minimum_required = ?result.minimum_required,
            "求解完成"
        );
        Ok(result)
    }
}
