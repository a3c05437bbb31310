//! 场景配置
//!
//! 纯文本配置文件，按节组织，每行一个逗号分隔的条目：
//!
//! ```text
//! # Hosts
//! <name>
//! # Routers
//! <name>, <bellman-ford | static>
//! # Connections
//! <name>, <source>, <dest>, <rate bit/s>, <delay s>, <buffer bytes>
//! # Flows
//! <name>, <source>, <dest>, <bits | inf>, <start s>, <congestion algorithm>
//! # Measurables
//! <name>, <flow | link>
//! ```
//!
//! 连接创建一对双向链路，名字指向 source→dest 方向。

mod error;

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, info};

pub use error::SetupError;

use crate::net::{DeviceId, LinkCostConfig, LinkId, LinkSpec, Network, RouterConfig};
use crate::proto::{CongestionKind, FlowConfig, FlowSpec};
use crate::routing::{RoutingConfig, RoutingKind};
use crate::sim::SimTime;

/// 构建场景时使用的调优参数
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScenarioConfig {
    pub flow: FlowConfig,
    pub router: RouterConfig,
    pub routing: RoutingConfig,
    pub cost: LinkCostConfig,
}

/// 解析后的场景：网络 arena 加上配置文件中的名字
#[derive(Debug)]
pub struct Scenario {
    pub network: Network,
    /// 流名 -> (源, 目的)
    pub flows: BTreeMap<String, (DeviceId, DeviceId)>,
    /// 连接名 -> source→dest 方向的链路
    pub links: BTreeMap<String, LinkId>,
    pub measured_flows: Vec<String>,
    pub measured_links: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Hosts,
    Routers,
    Connections,
    Flows,
    Measurables,
}

impl Section {
    fn header(line: &str) -> Option<Self> {
        let title = line.strip_prefix('#')?.trim();
        match title.to_ascii_lowercase().as_str() {
            "hosts" => Some(Section::Hosts),
            "routers" => Some(Section::Routers),
            "connections" => Some(Section::Connections),
            "flows" => Some(Section::Flows),
            "measurables" => Some(Section::Measurables),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Section::Hosts => "host",
            Section::Routers => "router",
            Section::Connections => "connection",
            Section::Flows => "flow",
            Section::Measurables => "measurable",
        }
    }

    fn arity(self) -> usize {
        match self {
            Section::Hosts => 1,
            Section::Routers => 2,
            Section::Connections => 6,
            Section::Flows => 6,
            Section::Measurables => 2,
        }
    }
}

fn number<T: FromStr>(line: usize, what: &'static str, value: &str) -> Result<T, SetupError> {
    value.parse().map_err(|_| SetupError::BadNumber {
        line,
        what,
        value: value.to_string(),
    })
}

fn seconds(line: usize, what: &'static str, value: &str) -> Result<SimTime, SetupError> {
    let secs: f64 = number(line, what, value)?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(SetupError::BadNumber {
            line,
            what,
            value: value.to_string(),
        });
    }
    Ok(SimTime::from_secs_f64(secs))
}

struct Builder<'a> {
    cfg: &'a ScenarioConfig,
    scenario: Scenario,
}

impl Builder<'_> {
    fn device(&self, line: usize, name: &str) -> Result<DeviceId, SetupError> {
        self.scenario
            .network
            .find(name)
            .ok_or_else(|| SetupError::UnknownDevice {
                line,
                name: name.to_string(),
            })
    }

    fn fresh_device(&self, line: usize, name: &str) -> Result<(), SetupError> {
        match self.scenario.network.find(name) {
            Some(_) => Err(SetupError::DuplicateName {
                line,
                name: name.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn entry(&mut self, section: Section, line: usize, f: &[&str]) -> Result<(), SetupError> {
        match section {
            Section::Hosts => {
                self.fresh_device(line, f[0])?;
                self.scenario.network.add_host(f[0]);
            }
            Section::Routers => {
                self.fresh_device(line, f[0])?;
                let kind: RoutingKind = f[1].parse().map_err(|tag| SetupError::UnknownRouting { line, tag })?;
                let algorithm = kind.build(&self.cfg.routing);
                self.scenario.network.add_router(f[0], algorithm, self.cfg.router);
            }
            Section::Connections => {
                let name = f[0];
                if self.scenario.links.contains_key(name) {
                    return Err(SetupError::DuplicateName {
                        line,
                        name: name.to_string(),
                    });
                }
                let src = self.device(line, f[1])?;
                let dst = self.device(line, f[2])?;
                let spec = LinkSpec {
                    rate_bps: number(line, "rate", f[3])?,
                    delay: seconds(line, "delay", f[4])?,
                    buffer_bytes: number(line, "buffer size", f[5])?,
                };
                let (forward, _) = self
                    .scenario
                    .network
                    .connect(src, dst, spec)
                    .map_err(|source| SetupError::Topology { line, source })?;
                self.scenario.links.insert(name.to_string(), forward);
            }
            Section::Flows => {
                let name = f[0];
                if self.scenario.flows.contains_key(name) {
                    return Err(SetupError::DuplicateName {
                        line,
                        name: name.to_string(),
                    });
                }
                let src = self.device(line, f[1])?;
                let dst = self.device(line, f[2])?;
                let bits = match f[3].to_ascii_lowercase().as_str() {
                    "inf" | "-" => None,
                    _ => Some(number(line, "flow size", f[3])?),
                };
                let start = seconds(line, "start time", f[4])?;
                let kind: CongestionKind = f[5]
                    .parse()
                    .map_err(|tag| SetupError::UnknownCongestion { line, tag })?;

                let spec = FlowSpec::new(name, dst, bits, start)
                    .with_congestion(kind)
                    .with_config(self.cfg.flow);
                self.scenario
                    .network
                    .add_flow(src, spec)
                    .map_err(|source| SetupError::Topology { line, source })?;
                self.scenario.flows.insert(name.to_string(), (src, dst));
            }
            Section::Measurables => {
                let (name, kind) = (f[0], f[1].to_ascii_lowercase());
                let known = match kind.as_str() {
                    "flow" => self.scenario.flows.contains_key(name),
                    "link" => self.scenario.links.contains_key(name),
                    _ => false,
                };
                if !known {
                    return Err(SetupError::UnknownMeasurable {
                        line,
                        kind,
                        name: name.to_string(),
                    });
                }
                let list = if kind == "flow" {
                    &mut self.scenario.measured_flows
                } else {
                    &mut self.scenario.measured_links
                };
                if !list.iter().any(|n| n == name) {
                    list.push(name.to_string());
                }
            }
        }
        Ok(())
    }
}

/// 解析配置文本
pub fn parse(text: &str, cfg: &ScenarioConfig) -> Result<Scenario, SetupError> {
    let mut network = Network::default();
    network.set_link_cost_config(cfg.cost);

    let mut b = Builder {
        cfg,
        scenario: Scenario {
            network,
            flows: BTreeMap::new(),
            links: BTreeMap::new(),
            measured_flows: Vec::new(),
            measured_links: Vec::new(),
        },
    };

    let mut section = None;
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('#') {
            section = Some(Section::header(trimmed).ok_or_else(|| SetupError::UnknownSection {
                line,
                section: trimmed.to_string(),
            })?);
            continue;
        }

        let sec = section.ok_or(SetupError::NoSection { line })?;
        let fields: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        if fields.len() != sec.arity() || fields.iter().any(|f| f.is_empty()) {
            return Err(SetupError::BadFieldCount {
                line,
                section: sec.label(),
                expected: sec.arity(),
                found: fields.iter().filter(|f| !f.is_empty()).count(),
            });
        }
        debug!(line, section = sec.label(), ?fields, "解析配置条目");
        b.entry(sec, line, &fields)?;
    }

    let s = &b.scenario;
    info!(
        devices = s.network.device_count(),
        connections = s.links.len(),
        flows = s.flows.len(),
        "📄 场景解析完成"
    );
    Ok(b.scenario)
}

/// 读取并解析配置文件
pub fn load(path: impl AsRef<Path>, cfg: &ScenarioConfig) -> Result<Scenario, SetupError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| SetupError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse(&text, cfg)
}
