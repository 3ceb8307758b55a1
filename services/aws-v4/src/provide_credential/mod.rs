mod env;
pub use env::EnvCredentialProvider;

mod profile;
pub use profile::ProfileCredentialProvider;

mod r#static;
pub use r#static::StaticCredentialProvider;

mod default;
pub use default::DefaultCredentialProvider;

mod assume_role_with_web_identity;
pub use assume_role_with_web_identity::AssumeRoleWithWebIdentityCredentialProvider;

mod ecs;
pub use ecs::EcsCredentialProvider;

mod imds;
pub use imds::ImdsCredentialProvider;
