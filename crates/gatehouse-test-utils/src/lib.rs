//! Test utilities for Gatehouse crates.

use serde_json::{json, Value};
use std::sync::Once;

pub mod pdp;

pub use pdp::MockPdp;

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// A contact entity as stored by the demo collection.
pub fn contact(id: &str, name: &str, email: &str) -> Value {
    json!({ "id": id, "name": name, "email": email })
}

/// The two seeded contacts, in store order.
pub fn seed_contacts() -> Vec<Value> {
    vec![
        contact("contact-1", "John Smith", "john@acme.com"),
        contact("contact-2", "Sarah Jane", "sarah@acme.com"),
    ]
}

/// Assert that a Result is Ok and return the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a Result is Err and return the error.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(v) => panic!("Expected Err, got Ok: {:?}", v),
            Err(e) => e,
        }
    };
}
