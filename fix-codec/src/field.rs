//! Field tags and enumerations for the vendor-extended FIX dialect.
//!
//! The vendor dialect is a superset of standard tag=value FIX: message
//! types `R`, `S`, `p` and the non-standard `OrdStatus='B'` are vendor
//! additions layered on top of the standard envelope and order-entry/
//! execution-report fields.

/// Standard session/header tags.
pub const TAG_BEGIN_STRING: u32 = 8;
pub const TAG_BODY_LENGTH: u32 = 9;
pub const TAG_MSG_TYPE: u32 = 35;
pub const TAG_SENDER_COMP_ID: u32 = 49;
pub const TAG_TARGET_COMP_ID: u32 = 56;
pub const TAG_MSG_SEQ_NUM: u32 = 34;
pub const TAG_SENDING_TIME: u32 = 52;
pub const TAG_CHECKSUM: u32 = 10;
pub const TAG_TEST_REQ_ID: u32 = 112;
pub const TAG_HEART_BT_INT: u32 = 108;
pub const TAG_ENCRYPT_METHOD: u32 = 98;
pub const TAG_BEGIN_SEQ_NO: u32 = 7;
pub const TAG_END_SEQ_NO: u32 = 16;
pub const TAG_NEW_SEQ_NO: u32 = 36;
pub const TAG_GAP_FILL_FLAG: u32 = 123;

/// Order-entry / execution-report tags.
pub const TAG_CL_ORD_ID: u32 = 11;
pub const TAG_ORIG_CL_ORD_ID: u32 = 41;
pub const TAG_ORDER_ID: u32 = 37;
pub const TAG_EXEC_ID: u32 = 17;
pub const TAG_EXEC_TYPE: u32 = 150;
pub const TAG_ORD_STATUS: u32 = 39;
pub const TAG_SYMBOL: u32 = 55;
pub const TAG_SIDE: u32 = 54;
pub const TAG_ORDER_QTY: u32 = 38;
pub const TAG_ORD_TYPE: u32 = 40;
pub const TAG_PRICE: u32 = 44;
pub const TAG_STOP_PX: u32 = 99;
pub const TAG_TIME_IN_FORCE: u32 = 59;
pub const TAG_LAST_QTY: u32 = 32;
pub const TAG_LAST_PX: u32 = 31;
pub const TAG_LEAVES_QTY: u32 = 151;
pub const TAG_CUM_QTY: u32 = 14;
pub const TAG_AVG_PX: u32 = 6;
pub const TAG_ACCOUNT: u32 = 1;
pub const TAG_TRANSACT_TIME: u32 = 60;
pub const TAG_TEXT: u32 = 58;
pub const TAG_EX_DESTINATION: u32 = 100;

/// Vendor short-locate extensions.
pub const TAG_QUOTE_REQ_ID: u32 = 131;
pub const TAG_QUOTE_ID: u32 = 117;
pub const TAG_OFFER_SIZE: u32 = 135;
/// `1` = accept, `2` = reject; carried alongside `QuoteID` on msg type `p`.
pub const TAG_LOCATE_RSP_TYPE: u32 = 133;

/// Message types, standard and vendor.
pub const MSG_TYPE_NEW_ORDER_SINGLE: &str = "D";
pub const MSG_TYPE_ORDER_CANCEL_REQUEST: &str = "F";
pub const MSG_TYPE_ORDER_CANCEL_REPLACE_REQUEST: &str = "G";
pub const MSG_TYPE_EXECUTION_REPORT: &str = "8";
pub const MSG_TYPE_QUOTE_REQUEST: &str = "R";
pub const MSG_TYPE_QUOTE_RESPONSE: &str = "S";
pub const MSG_TYPE_LOCATE_ACCEPT_REJECT: &str = "p";
pub const MSG_TYPE_LOGON: &str = "A";
pub const MSG_TYPE_LOGOUT: &str = "5";
pub const MSG_TYPE_HEARTBEAT: &str = "0";
pub const MSG_TYPE_TEST_REQUEST: &str = "1";
pub const MSG_TYPE_RESEND_REQUEST: &str = "2";
pub const MSG_TYPE_SEQUENCE_RESET: &str = "4";
pub const MSG_TYPE_REJECT: &str = "3";

/// Non-standard vendor order status: "calculated" / locate confirmed.
pub const ORD_STATUS_CALCULATED: char = 'B';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
    SellShort,
    SellShortExempt,
}

impl Side {
    pub fn from_fix(c: char) -> Option<Self> {
        match c {
            '1' => Some(Side::Buy),
            '2' => Some(Side::Sell),
            '5' => Some(Side::SellShort),
            '6' => Some(Side::SellShortExempt),
            _ => None,
        }
    }

    pub fn to_fix(self) -> char {
        match self {
            Side::Buy => '1',
            Side::Sell => '2',
            Side::SellShort => '5',
            Side::SellShortExempt => '6',
        }
    }

    pub fn is_short(self) -> bool {
        matches!(self, Side::SellShort | Side::SellShortExempt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrdType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl OrdType {
    pub fn from_fix(c: char) -> Option<Self> {
        match c {
            '1' => Some(OrdType::Market),
            '2' => Some(OrdType::Limit),
            '3' => Some(OrdType::Stop),
            '4' => Some(OrdType::StopLimit),
            _ => None,
        }
    }

    pub fn to_fix(self) -> char {
        match self {
            OrdType::Market => '1',
            OrdType::Limit => '2',
            OrdType::Stop => '3',
            OrdType::StopLimit => '4',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeInForce {
    Day,
    Gtc,
    Ioc,
    Fok,
}

impl TimeInForce {
    pub fn from_fix(c: char) -> Option<Self> {
        match c {
            '0' => Some(TimeInForce::Day),
            '1' => Some(TimeInForce::Gtc),
            '3' => Some(TimeInForce::Ioc),
            '4' => Some(TimeInForce::Fok),
            _ => None,
        }
    }

    pub fn to_fix(self) -> char {
        match self {
            TimeInForce::Day => '0',
            TimeInForce::Gtc => '1',
            TimeInForce::Ioc => '3',
            TimeInForce::Fok => '4',
        }
    }
}

/// `ExecType` (tag 150): the reason an execution report was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecType {
    New,
    PartialFill,
    Fill,
    Canceled,
    Replaced,
    PendingCancel,
    Rejected,
    PendingNew,
    Calculated,
}

impl ExecType {
    pub fn from_fix(c: char) -> Option<Self> {
        match c {
            '0' => Some(ExecType::New),
            '1' => Some(ExecType::PartialFill),
            '2' => Some(ExecType::Fill),
            '4' => Some(ExecType::Canceled),
            '5' => Some(ExecType::Replaced),
            '6' => Some(ExecType::PendingCancel),
            '8' => Some(ExecType::Rejected),
            'A' => Some(ExecType::PendingNew),
            'L' => Some(ExecType::Calculated),
            _ => None,
        }
    }

    pub fn to_fix(self) -> char {
        match self {
            ExecType::New => '0',
            ExecType::PartialFill => '1',
            ExecType::Fill => '2',
            ExecType::Canceled => '4',
            ExecType::Replaced => '5',
            ExecType::PendingCancel => '6',
            ExecType::Rejected => '8',
            ExecType::PendingNew => 'A',
            ExecType::Calculated => 'L',
        }
    }
}

/// `OrdStatus` (tag 39), including the vendor `'B'` calculated status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrdStatus {
    PendingNew,
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    PendingCancel,
    Rejected,
    Replaced,
    /// Vendor extension: locate confirmed, order calculated and ready.
    Calculated,
}

impl OrdStatus {
    pub fn from_fix(c: char) -> Option<Self> {
        match c {
            'A' => Some(OrdStatus::PendingNew),
            '0' => Some(OrdStatus::New),
            '1' => Some(OrdStatus::PartiallyFilled),
            '2' => Some(OrdStatus::Filled),
            '4' => Some(OrdStatus::Canceled),
            '6' => Some(OrdStatus::PendingCancel),
            '8' => Some(OrdStatus::Rejected),
            '5' => Some(OrdStatus::Replaced),
            'B' => Some(OrdStatus::Calculated),
            _ => None,
        }
    }

    pub fn to_fix(self) -> char {
        match self {
            OrdStatus::PendingNew => 'A',
            OrdStatus::New => '0',
            OrdStatus::PartiallyFilled => '1',
            OrdStatus::Filled => '2',
            OrdStatus::Canceled => '4',
            OrdStatus::PendingCancel => '6',
            OrdStatus::Rejected => '8',
            OrdStatus::Replaced => '5',
            OrdStatus::Calculated => 'B',
        }
    }
}
