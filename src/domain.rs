mod contact_id;
mod email_address;

use chrono::Utc;

pub use contact_id::ContactId;
pub use email_address::EmailAddress;

/// Format used for the `timestamp` attribute of stored contacts
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current time as a contact timestamp
pub fn timestamp() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}
