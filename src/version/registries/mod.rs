//! Package registry clients

pub mod nuget;

pub use nuget::NugetClient;
