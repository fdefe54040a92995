/*
[INPUT]:  API key/secret configuration
[OUTPUT]: Validated credentials and signed login requests
[POS]:    Auth layer - handles Zubr session authentication
[UPDATE]: When auth flow or signature method changes
*/

pub mod credentials;
pub mod signer;

pub use credentials::Credentials;
pub use signer::{LOGIN_METHOD, canonical_message, login_params, sign_login};
