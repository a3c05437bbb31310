use crate::net::{DeviceKind, LinkCostConfig, TopologyError};
use crate::report::Report;
use crate::setup::{self, ScenarioConfig, SetupError};
use crate::sim::{SimTime, Simulation};

const SCENARIO: &str = "\
# Hosts
H1
H2

# Routers
R1, bellman-ford
R2, bellman-ford

# Connections
L0, H1, R1, 10000000, 0.010, 64000
L1, R1, R2, 10000000, 0.010, 64000
L2, R2, H2, 10000000, 0.010, 64000

# Flows
F1, H1, H2, 160000, 0.5, fast

# Measurables
F1, flow
L1, link
";

fn parse(text: &str) -> Result<setup::Scenario, SetupError> {
    setup::parse(text, &ScenarioConfig::default())
}

#[test]
fn parses_a_complete_scenario() {
    let s = parse(SCENARIO).expect("valid scenario");
    let net = &s.network;

    assert_eq!(net.device_count(), 4);
    let h1 = net.find("H1").expect("H1");
    let h2 = net.find("H2").expect("H2");
    assert_eq!(net.kind(h1), DeviceKind::Host);
    assert_eq!(net.kind(net.find("R2").expect("R2")), DeviceKind::Router);

    // 每个连接两条单向链路
    assert_eq!(net.links().len(), 6);
    let l1 = s.links["L1"];
    let (from, to) = net.link_endpoints(l1);
    assert_eq!((net.name(from), net.name(to)), ("R1", "R2"));
    assert_eq!(net.link(l1).delay(), SimTime::from_millis(10));
    assert_eq!(net.link(l1).rate_bps(), 10_000_000);

    assert_eq!(s.flows["F1"], (h1, h2));
    let flow = net.host(h1).and_then(|h| h.flow(h2)).expect("flow");
    assert_eq!(flow.algorithm().name(), "fast");
    assert_eq!(flow.start(), SimTime::from_millis(500));
    assert_eq!(flow.total_bits(), Some(160_000));

    assert_eq!(s.measured_flows, vec!["F1".to_string()]);
    assert_eq!(s.measured_links, vec!["L1".to_string()]);
}

#[test]
fn parsed_scenario_runs_to_completion() {
    let cfg = ScenarioConfig {
        cost: LinkCostConfig::static_only(),
        ..ScenarioConfig::default()
    };
    let s = setup::parse(SCENARIO, &cfg).expect("valid scenario");
    let mut sim = Simulation::new(s.network);
    sim.run();

    let mut report = Report::build(&sim, SimTime::from_millis(100));
    report.name_links(&s.links);
    report.retain_measured(&s.measured_flows, &s.measured_links);

    assert_eq!(report.flows.len(), 1);
    assert_eq!(report.links.len(), 1);
    assert!(report.flow("F1").expect("F1").complete);
    assert!(report.link("L1").expect("L1").packets_sent >= 20);
    assert_eq!(report.stats.delivered_bits, 160_000);
}

#[test]
fn unbounded_flow_and_comments_free_layout() {
    let text = "#hosts\n a \n b\n#CONNECTIONS\nab,a,b,1000000,0,1000\n#flows\nf, a, b, inf, 0, aimd\n";
    let s = parse(text).expect("valid");
    let a = s.network.find("a").expect("a");
    let b = s.network.find("b").expect("b");
    let flow = s.network.host(a).and_then(|h| h.flow(b)).expect("flow");
    assert_eq!(flow.total_bits(), None);
    assert!(s.measured_flows.is_empty());
}

#[test]
fn unknown_device_reports_line() {
    let text = "# Hosts\nH1\n# Connections\nL0, H1, X, 1000, 0.1, 100\n";
    match parse(text) {
        Err(SetupError::UnknownDevice { line, name }) => {
            assert_eq!(line, 4);
            assert_eq!(name, "X");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn wrong_field_count_is_rejected() {
    let text = "# Hosts\nH1\nH2\n# Connections\nL0, H1, H2, 1000, 0.1\n";
    match parse(text) {
        Err(SetupError::BadFieldCount {
            line,
            section,
            expected,
            found,
        }) => {
            assert_eq!(line, 5);
            assert_eq!(section, "connection");
            assert_eq!(expected, 6);
            assert_eq!(found, 5);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn section_errors() {
    assert!(matches!(
        parse("# Switches\nS1\n"),
        Err(SetupError::UnknownSection { line: 1, .. })
    ));
    assert!(matches!(
        parse("\nH1\n# Hosts\n"),
        Err(SetupError::NoSection { line: 2 })
    ));
}

#[test]
fn unknown_algorithms_are_rejected() {
    let routing = "# Routers\nR1, ospf\n";
    assert!(matches!(
        parse(routing),
        Err(SetupError::UnknownRouting { line: 2, ref tag }) if tag == "ospf"
    ));

    let congestion = "# Hosts\nA\nB\n# Flows\nF, A, B, 100, 0, cubic\n";
    assert!(matches!(
        parse(congestion),
        Err(SetupError::UnknownCongestion { line: 5, ref tag }) if tag == "cubic"
    ));
}

#[test]
fn host_cannot_take_a_second_link() {
    let text = "\
# Hosts
A
B
C
# Connections
L0, A, B, 1000, 0, 1000
L1, A, C, 1000, 0, 1000
";
    match parse(text) {
        Err(SetupError::Topology { line, source }) => {
            assert_eq!(line, 7);
            assert_eq!(source, TopologyError::HostAlreadyConnected("A".to_string()));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn flow_must_start_on_a_host() {
    let text = "# Hosts\nA\n# Routers\nR, bellman-ford\n# Flows\nF, R, A, 100, 0, aimd\n";
    assert!(matches!(
        parse(text),
        Err(SetupError::Topology {
            line: 6,
            source: TopologyError::NotAHost(_)
        })
    ));
}

#[test]
fn duplicate_names_are_rejected() {
    assert!(matches!(
        parse("# Hosts\nA\n# Routers\nA, bellman-ford\n"),
        Err(SetupError::DuplicateName { line: 4, .. })
    ));

    let links = "# Hosts\nA\nB\n# Connections\nL, A, B, 1, 0, 1\nL, A, B, 1, 0, 1\n";
    assert!(matches!(
        parse(links),
        Err(SetupError::DuplicateName { line: 6, .. })
    ));
}

#[test]
fn measurable_must_exist() {
    let text = "# Hosts\nA\nB\n# Measurables\nF9, flow\n";
    match parse(text) {
        Err(SetupError::UnknownMeasurable { line, kind, name }) => {
            assert_eq!(line, 5);
            assert_eq!(kind, "flow");
            assert_eq!(name, "F9");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn bad_numbers_are_rejected() {
    let rate = "# Hosts\nA\nB\n# Connections\nL, A, B, fast, 0, 1\n";
    assert!(matches!(
        parse(rate),
        Err(SetupError::BadNumber { line: 5, what: "rate", .. })
    ));

    let delay = "# Hosts\nA\nB\n# Connections\nL, A, B, 1000, -0.5, 1\n";
    assert!(matches!(
        parse(delay),
        Err(SetupError::BadNumber { line: 5, what: "delay", .. })
    ));
}

#[test]
fn load_reports_missing_file() {
    let err = setup::load("/nonexistent/pktsim/scenario.txt", &ScenarioConfig::default())
        .expect_err("missing file");
    assert!(matches!(err, SetupError::Io { .. }));
    assert!(err.to_string().contains("scenario.txt"));
}

#[test]
fn static_router_forwards_between_its_hosts() {
    let text = "\
# Hosts
A
B
# Routers
R, static
# Connections
L0, A, R, 10000000, 0.001, 64000
L1, R, B, 10000000, 0.001, 64000
# Flows
F, A, B, 24000, 0, aimd
";
    let s = parse(text).expect("valid");
    let r = s.network.find("R").expect("R");
    let b = s.network.find("B").expect("B");
    assert_eq!(
        s.network.router(r).expect("router").algorithm().tag(),
        "static"
    );

    let mut sim = Simulation::new(s.network);
    sim.run();
    let net = sim.network();
    assert_eq!(net.stats.delivered_bits, 24_000);
    assert_eq!(net.stats.advertisements, 0);
    assert!(net.router(r).expect("router").next(b).is_some());
}
