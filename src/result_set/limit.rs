//! Limit classification
//!
//! Explains, once per result, why the candidate list may have been cut
//! short: an explicit final-size cap, the permission-evaluation budget, or
//! nothing at all.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LimitBy {
    #[default]
    Unlimited,
    FinalSize,
    NumberOfPermissionEvaluations,
}

/// Caller-supplied limits for one query execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultOptions {
    pub max_items: Option<usize>,
    pub limit_by: LimitBy,
    pub limit: Option<usize>,
    pub max_permission_checks: Option<usize>,
}

impl ResultOptions {
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn with_limit(mut self, limit_by: LimitBy, limit: usize) -> Self {
        self.limit_by = limit_by;
        self.limit = Some(limit);
        self
    }

    pub fn with_max_permission_checks(mut self, checks: usize) -> Self {
        self.max_permission_checks = Some(checks);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LimitClassification {
    pub limit_by: LimitBy,
    pub max_size: usize,
}

/// Classify a result of `len` candidates
pub fn classify(
    len: usize,
    options: &ResultOptions,
    configured_max_permission_checks: usize,
) -> LimitClassification {
    let final_size = options.max_items.or(match options.limit_by {
        LimitBy::FinalSize => options.limit,
        LimitBy::Unlimited | LimitBy::NumberOfPermissionEvaluations => None,
    });

    match final_size {
        Some(max_size) if len < max_size => LimitClassification {
            limit_by: LimitBy::Unlimited,
            max_size,
        },
        Some(max_size) => LimitClassification {
            limit_by: LimitBy::FinalSize,
            max_size,
        },
        None => LimitClassification {
            limit_by: LimitBy::NumberOfPermissionEvaluations,
            max_size: options
                .max_permission_checks
                .unwrap_or(configured_max_permission_checks),
        },
    }
}
