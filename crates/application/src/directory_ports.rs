mod identity;
mod organization;

pub use identity::IdentityDirectory;
pub use organization::OrganizationDirectory;
