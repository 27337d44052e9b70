//! Space accounting for client and vault accounts.

use serde::{Deserialize, Serialize};

/// Kind of change applied to an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmendmentKind {
    /// The account offers more space.
    #[default]
    SpaceOffered,
    /// The account's vault now stores data for others.
    SpaceGivenAdded,
    /// The account's vault stopped storing data for others.
    SpaceGivenRemoved,
    /// The account stored data on the network.
    SpaceTakenAdded,
    /// The account removed data from the network.
    SpaceTakenRemoved,
}

/// Apply a change to an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmendAccountRequest {
    /// Account being changed.
    pub account_name: String,
    /// Kind of change.
    pub amendment: AmendmentKind,
    /// Bytes involved.
    pub data_size: u64,
    /// Chunk the change relates to, if any.
    pub chunk_name: String,
}

/// Outcome of an amendment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmendAccountResponse {
    /// Whether the change was applied.
    pub amended: bool,
}

/// Announce an amendment that other account holders will send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectAmendmentRequest {
    /// Account that will be changed.
    pub account_name: String,
    /// Kind of change.
    pub amendment: AmendmentKind,
    /// Chunk the change relates to.
    pub chunk_name: String,
}

/// Acknowledgement of an announcement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectAmendmentResponse {
    /// Whether the announcement was recorded.
    pub acknowledged: bool,
}

/// Query the balance of an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatusRequest {
    /// Account queried.
    pub account_name: String,
    /// Space the caller intends to take, or zero.
    pub space_requested: u64,
}

/// Balance of an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatusResponse {
    /// Bytes the account offers.
    pub space_offered: u64,
    /// Bytes the account's vault stores for others.
    pub space_given: u64,
    /// Bytes the account stores on the network.
    pub space_taken: u64,
}

named_message!(
    AmendAccountRequest.account_name,
    ExpectAmendmentRequest.account_name,
    AccountStatusRequest.account_name,
);

plain_message!(
    AmendAccountResponse,
    ExpectAmendmentResponse,
    AccountStatusResponse,
);

service_group! {
    /// Account operations.
    group Account = "Account" {
        AmendAccount => "Apply a space change to an account.";
        ExpectAmendment => "Announce an upcoming account amendment.";
        AccountStatus => "Report the space balance of an account.";
    }
}
