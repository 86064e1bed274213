//! Remote collaborators behind the core boundary traits: the Firestore
//! REST document store, the email/password auth endpoint, and the image
//! upload host. Everything here is a thin, fallible adapter; no business
//! rules live in this crate.

pub mod auth;
pub mod firestore;
pub mod upload;

pub use auth::{AuthConfig, RestAuthProvider};
pub use firestore::{FirestoreConfig, FirestoreTaskStore};
pub use upload::{CloudinaryConfig, CloudinaryUploader};
