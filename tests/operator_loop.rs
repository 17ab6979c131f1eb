//! The plant operator driven end to end against a loopback simulator.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;

use serde_json::{Value, json};

use twofold::agent::{Agent, StopReason};
use twofold::arbitrate::Arbitrator;
use twofold::config::AgentSettings;
use twofold::cycle::DecisionCycle;
use twofold::operator::OperatorHost;
use twofold::proposer::Quiescent;
use twofold::term::Proposition;
use twofold::transport::{ReplyWait, TcpJsonTransport};

/// Serve one connection: one alert on the first check, none afterwards.
/// Returns every request received, in order.
fn spawn_simulator() -> (String, thread::JoinHandle<Vec<Value>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut writer = stream.try_clone().unwrap();
        let reader = BufReader::new(stream);
        let mut received = Vec::new();
        let mut alerts_sent = false;

        for line in reader.lines() {
            let Ok(line) = line else { break };
            let request: Value = serde_json::from_str(&line).unwrap();
            let reply = match request["action"].as_str().unwrap() {
                "checkForAlerts" if !alerts_sent => {
                    alerts_sent = true;
                    json!({ "alerts": ["HH"] })
                }
                "checkForAlerts" => json!({ "alerts": [] }),
                "checkTankWaterLevel" => json!({ "tank_level": 0.5 }),
                _ => json!({ "ack": true }),
            };
            received.push(request);
            writeln!(writer, "{reply}").unwrap();
        }
        received
    });
    (address, handle)
}

#[test]
fn operator_routine_runs_two_rounds_and_disconnects() {
    let (address, simulator) = spawn_simulator();
    let settings = AgentSettings::from_toml_str(
        r#"
        [routine]
        max_rounds = 2
        sleep_cap_secs = 0
        "#,
    )
    .unwrap();

    let transport = TcpJsonTransport::connect(&address, ReplyWait::Forever).unwrap();
    let cycle = DecisionCycle::new(
        OperatorHost::registry(settings.routine.sleep_cap()),
        Box::new(Quiescent),
        Box::new(settings.routine.planner().unwrap()),
    )
    .with_arbitrator(Arbitrator::new(settings.arbitration.bypass.into_policy()))
    .with_activation(settings.activation);
    let mut agent = Agent::new(OperatorHost::new(Box::new(transport)), cycle);

    let outcome = agent
        .run_loop(settings.run.max_iterations(), settings.run.disconnect_at_end)
        .unwrap();

    // Round one: alert found, addressed, sleep. Round two: no alert, so the
    // tank-level alternative runs instead.
    assert_eq!(outcome.stop, StopReason::NoActionChosen);
    assert_eq!(outcome.last_action, None);
    assert_eq!(outcome.cycles, 6);
    assert_eq!(outcome.iterations, 5);
    assert_eq!(agent.host().exchanges(), 4);

    let beliefs = agent.cycle().beliefs();
    let check: Proposition = "checkForAlerts(\"HH\")".parse().unwrap();
    assert!(beliefs.was_performed(&check));
    assert!(beliefs.is_false(&"checkForAlerts(alert)".parse().unwrap()));
    assert!(beliefs.was_performed(&"checkTankWaterLevel(\"0.5\")".parse().unwrap()));
    assert!(beliefs.was_performed(&"addressAlert(\"HH\")".parse().unwrap()));
    assert!(!beliefs.iter().any(|(p, _)| p.predicate() == "sleep"));
    // Only the failed check keeps its unbound variable.
    let open: Vec<String> = beliefs
        .iter()
        .filter(|(p, _)| !p.as_action().is_ground())
        .map(|(p, _)| p.to_string())
        .collect();
    assert_eq!(open, ["checkForAlerts(alert)"]);
    assert!(agent.cycle().activation().weight(&check) > 0.0);

    // The simulator only returns once the agent has closed the connection.
    let received = simulator.join().unwrap();
    let actions: Vec<&str> = received
        .iter()
        .map(|r| r["action"].as_str().unwrap())
        .collect();
    assert_eq!(
        actions,
        ["checkForAlerts", "addressAlert", "checkForAlerts", "checkTankWaterLevel"]
    );
    assert!(received.iter().all(|r| r["replier"] == "operator"));
    assert_eq!(received[0]["args"], json!(["alert"]));
    assert_eq!(received[1]["args"], json!(["\"HH\""]));
}
