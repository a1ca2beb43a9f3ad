use std::fmt;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::Dataset;

/// What the requester wants from the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Access,
    Download,
    Api,
    Consultation,
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestType::Access => write!(f, "access"),
            RequestType::Download => write!(f, "download"),
            RequestType::Api => write!(f, "api"),
            RequestType::Consultation => write!(f, "consultation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Standard,
    Urgent,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Standard => write!(f, "standard"),
            Priority::Urgent => write!(f, "urgent"),
            Priority::Critical => write!(f, "critical"),
        }
    }
}

/// A pending access-request line item, before the insertion timestamp is
/// assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartDraft {
    pub dataset: Dataset,
    pub request_type: RequestType,
    pub priority: Priority,
    pub business_justification: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub dataset: Dataset,
    pub request_type: RequestType,
    pub priority: Priority,
    pub business_justification: String,
    pub added_at: DateTime<Utc>,
}

/// Partial field merge for an existing item; absent fields are untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartUpdate {
    pub request_type: Option<RequestType>,
    pub priority: Option<Priority>,
    pub business_justification: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CartAction {
    Add(CartDraft),
    Remove(String),
    Update { dataset_id: String, update: CartUpdate },
    Clear,
    Toggle,
    Open,
    Close,
}

/// Cart contents plus the display flag. Mutated only through [`reduce`];
/// lives in memory for the life of the process.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartState {
    pub items: Vec<CartItem>,
    pub is_open: bool,
}

impl CartState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_in_cart(&self, dataset_id: &str) -> bool {
        self.items
            .iter()
            .any(|item| item.dataset.id.as_str() == dataset_id)
    }

    /// Applies an action with the current wall clock.
    pub fn apply(self, action: CartAction) -> Self {
        reduce(self, action, Utc::now())
    }
}

/// Pure transition: previous state + action -> next state. Never errors;
/// actions against absent dataset ids are no-ops.
pub fn reduce(mut state: CartState, action: CartAction, now: DateTime<Utc>) -> CartState {
    match action {
        CartAction::Add(draft) => {
            let item = CartItem {
                dataset: draft.dataset,
                request_type: draft.request_type,
                priority: draft.priority,
                business_justification: draft.business_justification,
                added_at: now,
            };
            // one item per dataset id: replace in place, keep position
            let existing = state
                .items
                .iter()
                .position(|entry| entry.dataset.id == item.dataset.id);
            match existing {
                Some(index) => state.items[index] = item,
                None => state.items.push(item),
            }
            state
        }
        CartAction::Remove(dataset_id) => {
            state
                .items
                .retain(|item| item.dataset.id.as_str() != dataset_id);
            state
        }
        CartAction::Update { dataset_id, update } => {
            if let Some(item) = state
                .items
                .iter_mut()
                .find(|item| item.dataset.id.as_str() == dataset_id)
            {
                if let Some(request_type) = update.request_type {
                    item.request_type = request_type;
                }
                if let Some(priority) = update.priority {
                    item.priority = priority;
                }
                if let Some(justification) = update.business_justification {
                    item.business_justification = justification;
                }
            }
            state
        }
        CartAction::Clear => {
            state.items.clear();
            state
        }
        CartAction::Toggle => {
            state.is_open = !state.is_open;
            state
        }
        CartAction::Open => {
            state.is_open = true;
            state
        }
        CartAction::Close => {
            state.is_open = false;
            state
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::fixtures::sample_datasets;

    fn draft(dataset: Dataset, priority: Priority) -> CartDraft {
        CartDraft {
            dataset,
            request_type: RequestType::Access,
            priority,
            business_justification: "Quarterly churn model refresh".to_string(),
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn add_appends_in_insertion_order() {
        let datasets = sample_datasets();
        let mut state = CartState::new();
        state = reduce(
            state,
            CartAction::Add(draft(datasets[0].clone(), Priority::Standard)),
            at(9),
        );
        state = reduce(
            state,
            CartAction::Add(draft(datasets[1].clone(), Priority::Standard)),
            at(10),
        );
        assert_eq!(state.len(), 2);
        assert_eq!(state.items[0].dataset.id, datasets[0].id);
        assert_eq!(state.items[1].dataset.id, datasets[1].id);
    }

    #[test]
    fn re_adding_replaces_in_place_with_fresh_timestamp() {
        let datasets = sample_datasets();
        let mut state = CartState::new();
        state = reduce(
            state,
            CartAction::Add(draft(datasets[0].clone(), Priority::Standard)),
            at(9),
        );
        state = reduce(
            state,
            CartAction::Add(draft(datasets[1].clone(), Priority::Standard)),
            at(10),
        );
        state = reduce(
            state,
            CartAction::Add(draft(datasets[0].clone(), Priority::Urgent)),
            at(11),
        );

        assert_eq!(state.len(), 2);
        // same position, latest values
        assert_eq!(state.items[0].dataset.id, datasets[0].id);
        assert_eq!(state.items[0].priority, Priority::Urgent);
        assert_eq!(state.items[0].added_at, at(11));
    }

    #[test]
    fn remove_absent_id_leaves_state_unchanged() {
        let datasets = sample_datasets();
        let state = reduce(
            CartState::new(),
            CartAction::Add(draft(datasets[0].clone(), Priority::Standard)),
            at(9),
        );
        let after = reduce(state.clone(), CartAction::Remove("nope".to_string()), at(10));
        assert_eq!(after, state);
    }

    #[test]
    fn update_merges_partial_fields() {
        let datasets = sample_datasets();
        let id = datasets[0].id.as_str().to_string();
        let mut state = reduce(
            CartState::new(),
            CartAction::Add(draft(datasets[0].clone(), Priority::Standard)),
            at(9),
        );
        state = reduce(
            state,
            CartAction::Update {
                dataset_id: id,
                update: CartUpdate {
                    priority: Some(Priority::Critical),
                    ..CartUpdate::default()
                },
            },
            at(10),
        );
        assert_eq!(state.items[0].priority, Priority::Critical);
        assert_eq!(state.items[0].request_type, RequestType::Access);
        // update does not refresh the insertion timestamp
        assert_eq!(state.items[0].added_at, at(9));
    }

    #[test]
    fn update_absent_id_is_a_no_op() {
        let state = CartState::new();
        let after = reduce(
            state.clone(),
            CartAction::Update {
                dataset_id: "ghost".to_string(),
                update: CartUpdate::default(),
            },
            at(9),
        );
        assert_eq!(after, state);
    }

    #[test]
    fn clear_leaves_open_flag_alone() {
        let datasets = sample_datasets();
        let mut state = reduce(
            CartState::new(),
            CartAction::Add(draft(datasets[0].clone(), Priority::Standard)),
            at(9),
        );
        state = reduce(state, CartAction::Open, at(9));
        state = reduce(state, CartAction::Clear, at(9));
        assert!(state.is_empty());
        assert!(state.is_open);
    }

    #[test]
    fn open_close_toggle() {
        let mut state = CartState::new();
        assert!(!state.is_open);
        state = reduce(state, CartAction::Toggle, at(9));
        assert!(state.is_open);
        state = reduce(state, CartAction::Toggle, at(9));
        assert!(!state.is_open);
        state = reduce(state, CartAction::Open, at(9));
        assert!(state.is_open);
        state = reduce(state, CartAction::Close, at(9));
        assert!(!state.is_open);
    }

    #[test]
    fn is_in_cart_tracks_membership() {
        let datasets = sample_datasets();
        let id = datasets[0].id.as_str().to_string();
        let mut state = reduce(
            CartState::new(),
            CartAction::Add(draft(datasets[0].clone(), Priority::Standard)),
            at(9),
        );
        assert!(state.is_in_cart(&id));
        state = reduce(state, CartAction::Remove(id.clone()), at(10));
        assert!(!state.is_in_cart(&id));
    }
}
