//! PII/PHI classification and masking of result payloads.

pub mod masking;
pub mod sensitivity;

pub use masking::{mask_address, mask_date, mask_email, mask_generic, mask_phone, mask_value};
pub use sensitivity::{classify_field, FieldSensitivity, GdprConfig, SensitivityFilter};
