//! IMAP response codec.
//!
//! This module provides a sans-I/O classifier for the replies the engine
//! expects: tagged status lines with optional untagged data, the server
//! greeting, and SASL continuation requests.
//!
//! # Example
//!
//! ```
//! use mailadmin_imap::parser::ResponseParser;
//! use mailadmin_imap::Status;
//!
//! let input = b"* QUOTA user/alice (STORAGE 1234 5000)\r\na000002 OK done\r\n";
//! let response = ResponseParser::classify(input, "a0000000002").unwrap();
//!
//! assert_eq!(response.status(), Status::Ok);
//! let quota = response.quota().unwrap();
//! assert_eq!((quota.used, quota.limit), (1234, 5000));
//! ```

pub mod response;

pub use response::{Greeting, Response, ResponseParser};
