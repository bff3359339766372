//! Wallet-signature authentication: challenges, signature recovery, sessions.

pub mod address;
pub mod middleware;
pub mod nonce;
pub mod service;
pub mod session;
pub mod verify;

pub use address::Address;
pub use middleware::{AppState, AuthSession};
pub use nonce::{generate_nonce, NonceRegistry};
pub use service::{login_message, AuthService};
pub use session::{Claims, SessionIssuer};
pub use verify::{recover_address, sign_personal_message, verify_signature};
