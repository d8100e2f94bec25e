//! Amazon Web Services resource types.

mod cognito;
mod compute;
mod load_balancing;
mod network;
mod s3;

pub use cognito::CognitoUserPoolDomain;
pub use compute::{AutoscalingGroup, EksNodeGroup, Instance, LaunchTemplate};
pub use load_balancing::{Listener, LoadBalancer, TargetGroup};
pub use network::{SecurityGroup, Subnet, Vpc};
pub use s3::{S3Bucket, S3Object};
