//! Collaborator seams (DNS, HTTP) and name helpers shared by the resolvers.

pub mod dns;
pub mod domain;
pub mod http;
