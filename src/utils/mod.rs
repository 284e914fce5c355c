pub mod response; // Response envelope builders
pub mod validator; // Request body validation
