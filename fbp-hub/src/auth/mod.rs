// Discord sign-in: the OAuth2 client used by the proxy and the session model
// built from its responses.

pub mod discord;
pub mod session;
