use serde::{Deserialize, Serialize};

/// Caller-specified inclusion policy, applied after merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilePolicy {
    /// Keep only entities installed on this machine.
    pub installed_only: bool,
    /// Drop DLC/addons, keeping base entities.
    pub base_only: bool,
    /// Keep only entities backed by an owned/catalog record.
    pub owned_only: bool,
    /// Keep entities the user hid in their launcher.
    pub include_hidden: bool,
    /// Account to scope catalog reads to. Only adapters look at this.
    pub account: Option<String>,
}

impl ReconcilePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn installed_only(mut self, yes: bool) -> Self {
        self.installed_only = yes;
        self
    }

    pub fn base_only(mut self, yes: bool) -> Self {
        self.base_only = yes;
        self
    }

    pub fn owned_only(mut self, yes: bool) -> Self {
        self.owned_only = yes;
        self
    }

    pub fn include_hidden(mut self, yes: bool) -> Self {
        self.include_hidden = yes;
        self
    }

    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }
}
