use crate::combat::conditions::{Condition, ConditionSubject};
use crate::stats::{DoubleStat, StatFunction};
use std::sync::Arc;

/// One stat function contributed by a skill, option or item.
#[derive(Debug, Clone)]
pub struct FuncTemplate {
    attach_cond: Option<Arc<dyn Condition>>,
    apply_cond: Option<Arc<dyn Condition>>,
    function: StatFunction,
    stat: DoubleStat,
    order: i32,
    value: f64,
}

impl FuncTemplate {
    /// A negative `order` selects the function's default order.
    pub fn new(
        attach_cond: Option<Arc<dyn Condition>>,
        apply_cond: Option<Arc<dyn Condition>>,
        function: StatFunction,
        order: i32,
        stat: DoubleStat,
        value: f64,
    ) -> Self {
        let order = if order >= 0 {
            order
        } else {
            function.default_order()
        };
        Self {
            attach_cond,
            apply_cond,
            function,
            stat,
            order,
            value,
        }
    }

    pub fn simple(function: StatFunction, stat: DoubleStat, value: f64) -> Self {
        Self::new(None, None, function, -1, stat, value)
    }

    pub fn function(&self) -> StatFunction {
        self.function
    }

    pub fn stat(&self) -> DoubleStat {
        self.stat
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn meet_condition(&self, subject: &ConditionSubject) -> bool {
        if let Some(cond) = &self.attach_cond {
            if !cond.test(subject) {
                return false;
            }
        }
        if let Some(cond) = &self.apply_cond {
            if !cond.test(subject) {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, current: f64) -> f64 {
        self.function.apply(current, self.value)
    }
}
