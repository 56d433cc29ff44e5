//! Stable identifiers for rules and rule categories.
//!
//! Rule IDs are kebab-case and prefixed by the resource family they inspect.

// Categories
pub const CATEGORY_NETWORK: &str = "network";
pub const CATEGORY_STORAGE: &str = "storage";
pub const CATEGORY_COMPUTE: &str = "compute";
pub const CATEGORY_DATABASE: &str = "database";
pub const CATEGORY_IDENTITY: &str = "identity";
pub const CATEGORY_SECRETS: &str = "secrets";
pub const CATEGORY_API: &str = "api";

// Rules: network
pub const RULE_SG_NO_UNEXPECTED_PORTS: &str = "sg-no-unexpected-ports";
pub const RULE_SG_NO_PUBLIC_SSH: &str = "sg-no-public-ssh";
pub const RULE_SG_DB_SOURCE_IS_SECURITY_GROUP: &str = "sg-db-source-is-security-group";
pub const RULE_VPC_PRIVATE_CIDR: &str = "vpc-private-cidr";
pub const RULE_VPC_DNS_ENABLED: &str = "vpc-dns-enabled";
pub const RULE_SUBNET_PRIVATE_CIDR: &str = "subnet-private-cidr";
pub const RULE_SUBNET_PUBLIC_IP_ON_LAUNCH: &str = "subnet-public-ip-on-launch";
pub const RULE_SUBNET_BELONGS_TO_VPC: &str = "subnet-belongs-to-vpc";
pub const RULE_ROUTE_USES_KNOWN_GATEWAY: &str = "route-uses-known-gateway";
pub const RULE_VPCE_PRIVATE_DNS_ENABLED: &str = "vpce-private-dns-enabled";
pub const RULE_VPCE_SERVICE_NAME: &str = "vpce-service-name";
pub const RULE_VPCE_ALLOWED_TYPE: &str = "vpce-allowed-type";
pub const RULE_VPCE_BELONGS_TO_VPC: &str = "vpce-belongs-to-vpc";

// Rules: storage
pub const RULE_S3_NO_PUBLIC_READ: &str = "s3-no-public-read";
pub const RULE_S3_ENCRYPTION_ENABLED: &str = "s3-encryption-enabled";
pub const RULE_S3_VERSIONING_ENABLED: &str = "s3-versioning-enabled";
pub const RULE_S3_LOGGING_ENABLED: &str = "s3-logging-enabled";

// Rules: compute
pub const RULE_EC2_ALLOWED_INSTANCE_TYPE: &str = "ec2-allowed-instance-type";
pub const RULE_EC2_PUBLIC_IP: &str = "ec2-public-ip";
pub const RULE_EC2_IAM_PROFILE: &str = "ec2-iam-profile";
pub const RULE_EC2_EBS_ENCRYPTED: &str = "ec2-ebs-encrypted";
pub const RULE_LAMBDA_IN_VPC: &str = "lambda-in-vpc";

// Rules: database
pub const RULE_RDS_IN_SUBNET_GROUP: &str = "rds-in-subnet-group";
pub const RULE_RDS_ALLOWED_INSTANCE_CLASS: &str = "rds-allowed-instance-class";
pub const RULE_RDS_NOT_PUBLIC: &str = "rds-not-public";
pub const RULE_RDS_STORAGE_ENCRYPTED: &str = "rds-storage-encrypted";
pub const RULE_RDS_USERNAME_NOT_DEFAULT: &str = "rds-username-not-default";
pub const RULE_RDS_MONITORING_ENABLED: &str = "rds-monitoring-enabled";
pub const RULE_RDS_BACKUP_RETENTION: &str = "rds-backup-retention";
pub const RULE_RDS_MULTI_AZ: &str = "rds-multi-az";
pub const RULE_RDS_LOGGING_ENABLED: &str = "rds-logging-enabled";

// Rules: identity
pub const RULE_IAM_ROLE_TRUSTED_PRINCIPALS: &str = "iam-role-trusted-principals";
pub const RULE_IAM_POLICY_NO_WILDCARD_ADMIN: &str = "iam-policy-no-wildcard-admin";
pub const RULE_VPC_FLOW_LOGS_ENABLED: &str = "vpc-flow-logs-enabled";
pub const RULE_LAMBDA_POLICY_ATTACH: &str = "lambda-policy-attach";

// Rules: secrets
pub const RULE_SECRET_ROTATION_ENABLED: &str = "secret-rotation-enabled";
pub const RULE_SECRET_CUSTOM_KMS_KEY: &str = "secret-custom-kms-key";

// Rules: api
pub const RULE_APIGW_CACHE_CLUSTER_ENABLED: &str = "apigw-cache-cluster-enabled";
pub const RULE_APIGW_PRIVATE_ENDPOINT: &str = "apigw-private-endpoint";
pub const RULE_APIGW_ACCESS_LOGGING: &str = "apigw-access-logging";

/// Every built-in rule ID, in the order the default registry registers them.
pub fn all_rule_ids() -> &'static [&'static str] {
    &[
        RULE_SG_NO_UNEXPECTED_PORTS,
        RULE_SG_NO_PUBLIC_SSH,
        RULE_SG_DB_SOURCE_IS_SECURITY_GROUP,
        RULE_VPC_PRIVATE_CIDR,
        RULE_VPC_DNS_ENABLED,
        RULE_SUBNET_PRIVATE_CIDR,
        RULE_SUBNET_PUBLIC_IP_ON_LAUNCH,
        RULE_SUBNET_BELONGS_TO_VPC,
        RULE_ROUTE_USES_KNOWN_GATEWAY,
        RULE_VPCE_PRIVATE_DNS_ENABLED,
        RULE_VPCE_SERVICE_NAME,
        RULE_VPCE_ALLOWED_TYPE,
        RULE_VPCE_BELONGS_TO_VPC,
        RULE_S3_NO_PUBLIC_READ,
        RULE_S3_ENCRYPTION_ENABLED,
        RULE_S3_VERSIONING_ENABLED,
        RULE_S3_LOGGING_ENABLED,
        RULE_EC2_ALLOWED_INSTANCE_TYPE,
        RULE_EC2_PUBLIC_IP,
        RULE_EC2_IAM_PROFILE,
        RULE_EC2_EBS_ENCRYPTED,
        RULE_LAMBDA_IN_VPC,
        RULE_RDS_IN_SUBNET_GROUP,
        RULE_RDS_ALLOWED_INSTANCE_CLASS,
        RULE_RDS_NOT_PUBLIC,
        RULE_RDS_STORAGE_ENCRYPTED,
        RULE_RDS_USERNAME_NOT_DEFAULT,
        RULE_RDS_MONITORING_ENABLED,
        RULE_RDS_BACKUP_RETENTION,
        RULE_RDS_MULTI_AZ,
        RULE_RDS_LOGGING_ENABLED,
        RULE_IAM_ROLE_TRUSTED_PRINCIPALS,
        RULE_IAM_POLICY_NO_WILDCARD_ADMIN,
        RULE_VPC_FLOW_LOGS_ENABLED,
        RULE_LAMBDA_POLICY_ATTACH,
        RULE_SECRET_ROTATION_ENABLED,
        RULE_SECRET_CUSTOM_KMS_KEY,
        RULE_APIGW_CACHE_CLUSTER_ENABLED,
        RULE_APIGW_PRIVATE_ENDPOINT,
        RULE_APIGW_ACCESS_LOGGING,
    ]
}

pub fn all_categories() -> &'static [&'static str] {
    &[
        CATEGORY_NETWORK,
        CATEGORY_STORAGE,
        CATEGORY_COMPUTE,
        CATEGORY_DATABASE,
        CATEGORY_IDENTITY,
        CATEGORY_SECRETS,
        CATEGORY_API,
    ]
}
