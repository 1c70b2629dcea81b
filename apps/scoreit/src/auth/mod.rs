// Session/credential lifecycle: request layers for auth, session and profile
// routes, the route guard, and the flows that tie them to the credential store.

pub mod client;
pub mod guard;
pub mod lifecycle;
pub mod profile;
pub mod session_client;
