use serde::{Deserialize, Serialize};

/// Which of the venue's two short-locate sub-protocols a `LOCATE`-class
/// route speaks. See the mirror engine's locate handling for the wire
/// sequence each variant drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocateType {
    PriceInquiryDirect,
    OfferAcceptReject,
}

/// A named execution destination (`ex_destination`). Non-locate routes
/// leave `locate_type` unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: i64,
    pub name: String,
    pub broker: String,
    pub priority: i32,
    pub active: bool,
    pub locate_type: Option<LocateType>,
}

impl Route {
    pub fn is_locate(&self) -> bool {
        self.locate_type.is_some()
    }
}
