use super::utils::{ids_of, is_open_cidr, is_private_cidr, is_true};
use crate::model::{Property, Resource, ResourceKind, StackContext};
use crate::policy::RuleParams;
use crate::rule::{ResourcePolicy, Rule, RuleError, RuleMeta, StackFinding, StackPolicy};
use stackguard_types::{Severity, ids};

const SSH_PORT: i64 = 22;
const POSTGRES_PORT: i64 = 5432;

pub fn rules(params: &RuleParams) -> Vec<Rule> {
    let allowed_ports = params.allowed_ports.clone();
    let allowed_endpoint_types = params.allowed_endpoint_types.clone();

    vec![
        ResourcePolicy::new(
            meta(
                ids::RULE_SG_NO_UNEXPECTED_PORTS,
                Severity::Mandatory,
                "Security group rules may only open ports from the allowed list",
                "Restrict fromPort/toPort to an allowed port or extend `allowed_ports` in stackguard.toml.",
            ),
            [ResourceKind::SecurityGroupRule],
            move |r, _| unexpected_ports(r, &allowed_ports),
        )
        .into(),
        ResourcePolicy::new(
            meta(
                ids::RULE_SG_NO_PUBLIC_SSH,
                Severity::Mandatory,
                "SSH must not be reachable from the whole internet",
                "Set cidrBlocks to your office range or a single trusted address.",
            ),
            [ResourceKind::SecurityGroupRule],
            public_ssh,
        )
        .into(),
        ResourcePolicy::new(
            meta(
                ids::RULE_SG_DB_SOURCE_IS_SECURITY_GROUP,
                Severity::Mandatory,
                "Database port rules must use a security group as their source",
                "Set sourceSecurityGroupId to the application security group instead of CIDR blocks.",
            ),
            [ResourceKind::SecurityGroupRule],
            db_source_is_security_group,
        )
        .into(),
        ResourcePolicy::new(
            meta(
                ids::RULE_VPC_PRIVATE_CIDR,
                Severity::Mandatory,
                "VPCs must use a private CIDR block",
                "Pick a cidrBlock inside 10.0.0.0/8, 172.16.0.0/12 or 192.168.0.0/16.",
            ),
            [ResourceKind::Vpc],
            |r, _| private_cidr(r, "VPC"),
        )
        .into(),
        ResourcePolicy::new(
            meta(
                ids::RULE_VPC_DNS_ENABLED,
                Severity::Mandatory,
                "VPCs must enable DNS hostnames and DNS support",
                "Set enableDnsHostnames and enableDnsSupport to true.",
            ),
            [ResourceKind::Vpc],
            dns_enabled,
        )
        .into(),
        ResourcePolicy::new(
            meta(
                ids::RULE_SUBNET_PRIVATE_CIDR,
                Severity::Mandatory,
                "Subnets must use a private CIDR block",
                "Pick a cidrBlock inside the VPC's private range.",
            ),
            [ResourceKind::Subnet],
            |r, _| private_cidr(r, "subnet"),
        )
        .into(),
        ResourcePolicy::new(
            meta(
                ids::RULE_SUBNET_PUBLIC_IP_ON_LAUNCH,
                Severity::Mandatory,
                "Subnets must assign public IPs to instances on launch",
                "Set mapPublicIpOnLaunch to true.",
            ),
            [ResourceKind::Subnet],
            |r, _| {
                Ok(if is_true(r, "mapPublicIpOnLaunch")? {
                    Vec::new()
                } else {
                    vec![format!(
                        "subnet '{}' does not assign public IPs to instances on launch",
                        r.display_name()
                    )]
                })
            },
        )
        .into(),
        StackPolicy::new(
            meta(
                ids::RULE_SUBNET_BELONGS_TO_VPC,
                Severity::Mandatory,
                "Every subnet must reference a VPC declared in the same stack",
                "Point vpcId at a VPC created by this stack.",
            ),
            |snapshot| {
                let vpcs = ids_of(snapshot, &ResourceKind::Vpc);
                let mut out = Vec::new();
                for subnet in snapshot.of_kind(&ResourceKind::Subnet) {
                    match subnet.str_property("vpcId").into_result()? {
                        Some(vpc_id) if vpcs.contains(vpc_id) => {}
                        Some(vpc_id) => out.push(StackFinding::on(
                            subnet,
                            format!(
                                "subnet '{}' references unknown VPC id '{}'",
                                subnet.display_name(),
                                vpc_id
                            ),
                        )),
                        None => out.push(StackFinding::on(
                            subnet,
                            format!("subnet '{}' has no vpcId", subnet.display_name()),
                        )),
                    }
                }
                Ok(out)
            },
        )
        .into(),
        StackPolicy::new(
            meta(
                ids::RULE_ROUTE_USES_KNOWN_GATEWAY,
                Severity::Mandatory,
                "Routes must target an internet gateway declared in the same stack",
                "Point gatewayId at an internet gateway created by this stack.",
            ),
            |snapshot| {
                let gateways = ids_of(snapshot, &ResourceKind::InternetGateway);
                let mut out = Vec::new();
                for route in snapshot.of_kind(&ResourceKind::Route) {
                    // Routes through NAT gateways, peering and the like carry no gatewayId.
                    let Some(gateway) = route.str_property("gatewayId").into_result()? else {
                        continue;
                    };
                    if gateway != "local" && !gateways.contains(gateway) {
                        out.push(StackFinding::on(
                            route,
                            format!("route '{}' uses unknown gateway id '{}'", route.name(), gateway),
                        ));
                    }
                }
                Ok(out)
            },
        )
        .into(),
        ResourcePolicy::new(
            meta(
                ids::RULE_VPCE_PRIVATE_DNS_ENABLED,
                Severity::Mandatory,
                "Interface VPC endpoints must enable private DNS",
                "Set privateDnsEnabled to true on interface endpoints.",
            ),
            [ResourceKind::VpcEndpoint],
            |r, _| {
                if endpoint_type(r)? != "Interface" || is_true(r, "privateDnsEnabled")? {
                    return Ok(Vec::new());
                }
                Ok(vec![format!(
                    "VPC endpoint '{}' does not enable private DNS",
                    r.display_name()
                )])
            },
        )
        .into(),
        ResourcePolicy::new(
            meta(
                ids::RULE_VPCE_SERVICE_NAME,
                Severity::Mandatory,
                "VPC endpoints must name an AWS service in the stack's region",
                "Set serviceName to com.amazonaws.<region>.<service> using the stack's region.",
            ),
            [ResourceKind::VpcEndpoint],
            service_name,
        )
        .into(),
        ResourcePolicy::new(
            meta(
                ids::RULE_VPCE_ALLOWED_TYPE,
                Severity::Mandatory,
                "VPC endpoints must use an allowed endpoint type",
                "Use an endpoint type from `allowed_endpoint_types`.",
            ),
            [ResourceKind::VpcEndpoint],
            move |r, _| {
                let kind = endpoint_type(r)?;
                if allowed_endpoint_types.iter().any(|t| t == kind) {
                    return Ok(Vec::new());
                }
                Ok(vec![format!(
                    "VPC endpoint '{}' uses endpoint type '{}'; allowed: {}",
                    r.display_name(),
                    kind,
                    allowed_endpoint_types.join(", ")
                )])
            },
        )
        .into(),
        StackPolicy::new(
            meta(
                ids::RULE_VPCE_BELONGS_TO_VPC,
                Severity::Mandatory,
                "Every VPC endpoint must reference a VPC declared in the same stack",
                "Point vpcId at a VPC created by this stack.",
            ),
            |snapshot| {
                let vpcs = ids_of(snapshot, &ResourceKind::Vpc);
                let mut out = Vec::new();
                for endpoint in snapshot.of_kind(&ResourceKind::VpcEndpoint) {
                    let vpc_id = endpoint.str_property("vpcId").into_result()?;
                    if !vpc_id.is_some_and(|id| vpcs.contains(id)) {
                        out.push(StackFinding::on(
                            endpoint,
                            format!(
                                "VPC endpoint '{}' references unknown VPC id '{}'",
                                endpoint.display_name(),
                                vpc_id.unwrap_or("<unset>")
                            ),
                        ));
                    }
                }
                Ok(out)
            },
        )
        .into(),
    ]
}

fn meta(id: &str, severity: Severity, description: &str, remediation: &str) -> RuleMeta {
    RuleMeta::new(id, ids::CATEGORY_NETWORK, severity, description).with_remediation(remediation)
}

fn unexpected_ports(r: &Resource, allowed: &[i64]) -> Result<Vec<String>, RuleError> {
    let from = r.int_property("fromPort").into_result()?;
    let to = r.int_property("toPort").into_result()?;
    let (Some(from), Some(to)) = (from, to) else {
        return Ok(Vec::new());
    };

    if allowed.contains(&from) || allowed.contains(&to) {
        return Ok(Vec::new());
    }
    let expected: Vec<String> = allowed.iter().map(i64::to_string).collect();
    Ok(vec![format!(
        "security group rule '{}' opens unexpected port range {}-{}; allowed ports: {}",
        r.name(),
        from,
        to,
        expected.join(", ")
    )])
}

fn public_ssh(r: &Resource, _ctx: &StackContext) -> Result<Vec<String>, RuleError> {
    if r.int_property("toPort").into_result()? != Some(SSH_PORT) {
        return Ok(Vec::new());
    }

    let mut open = Vec::new();
    for path in ["cidrBlocks", "ipv6CidrBlocks"] {
        if let Some(blocks) = r.str_list_property(path).into_result()? {
            open.extend(blocks.into_iter().filter(|c| is_open_cidr(c)));
        }
    }
    if open.is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![format!(
        "security group rule '{}' allows unrestricted SSH access from {}",
        r.name(),
        open.join(", ")
    )])
}

fn db_source_is_security_group(
    r: &Resource,
    _ctx: &StackContext,
) -> Result<Vec<String>, RuleError> {
    let from = r.int_property("fromPort").into_result()?;
    let to = r.int_property("toPort").into_result()?;
    if from != Some(POSTGRES_PORT) || to != Some(POSTGRES_PORT) {
        return Ok(Vec::new());
    }

    match r.str_property("sourceSecurityGroupId").into_result()? {
        Some(source) if source.starts_with("sg-") => Ok(Vec::new()),
        _ => Ok(vec![format!(
            "security group rule '{}' opens the database port to a source other than a security group",
            r.name()
        )]),
    }
}

fn private_cidr(r: &Resource, noun: &str) -> Result<Vec<String>, RuleError> {
    match r.str_property("cidrBlock").into_result()? {
        None => Ok(vec![format!(
            "{} '{}' has no cidrBlock configured",
            noun,
            r.display_name()
        )]),
        Some(cidr) if is_private_cidr("cidrBlock", cidr)? => Ok(Vec::new()),
        Some(cidr) => Ok(vec![format!(
            "{} '{}' uses public CIDR block {}; use a private range",
            noun,
            r.display_name(),
            cidr
        )]),
    }
}

fn dns_enabled(r: &Resource, _ctx: &StackContext) -> Result<Vec<String>, RuleError> {
    let mut out = Vec::new();
    if !is_true(r, "enableDnsHostnames")? {
        out.push(format!("VPC '{}' does not enable DNS hostnames", r.display_name()));
    }
    if !is_true(r, "enableDnsSupport")? {
        out.push(format!("VPC '{}' does not enable DNS support", r.display_name()));
    }
    Ok(out)
}

/// The region is only pinned when the context names one.
fn service_name(r: &Resource, ctx: &StackContext) -> Result<Vec<String>, RuleError> {
    let Some(service) = r.str_property("serviceName").into_result()? else {
        return Ok(vec![format!(
            "VPC endpoint '{}' has no serviceName",
            r.display_name()
        )]);
    };

    let Some((region, svc)) = split_service_name(service) else {
        return Ok(vec![format!(
            "VPC endpoint '{}' uses service name '{}'; expected com.amazonaws.<region>.<service>",
            r.display_name(),
            service
        )]);
    };

    if let Some(expected) = ctx.region.as_deref()
        && region != expected
    {
        return Ok(vec![format!(
            "VPC endpoint '{}' targets service '{}' in region {} instead of {}",
            r.display_name(),
            svc,
            region,
            expected
        )]);
    }
    Ok(Vec::new())
}

/// Region and service of `com.amazonaws.<region>.<service>`. PrivateLink endpoint
/// services read `com.amazonaws.vpce.<region>.<service>`.
fn split_service_name(service: &str) -> Option<(&str, &str)> {
    let rest = service.strip_prefix("com.amazonaws.")?;
    let rest = rest.strip_prefix("vpce.").unwrap_or(rest);
    let (region, svc) = rest.split_once('.')?;
    (!region.is_empty() && !svc.is_empty()).then_some((region, svc))
}

/// AWS treats an endpoint without an explicit type as a gateway endpoint.
fn endpoint_type(r: &Resource) -> Result<&str, RuleError> {
    Ok(match r.str_property("vpcEndpointType") {
        Property::Present(t) => t,
        Property::Absent => "Gateway",
        Property::WrongShape { path, expected } => {
            return Err(RuleError::UnexpectedShape { path, expected });
        }
    })
}
