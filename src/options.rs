//! Command-line options derived from configured connections.
//!
//! The options string is what ends up in the rendered unit files, so it must
//! not depend on the order relations were joined in.
use crate::agent::{AgentState, ConnectionRecord, Service};

/// Build the option string for every service with a present record.
pub fn build_options(state: &AgentState) -> String {
    let mut options = String::new();
    for service in Service::ALL {
        if let Some(record) = state.connection(service) {
            add_option(&mut options, &service_fragment(service, record));
        }
    }
    options
}

fn service_fragment(service: Service, record: &ConnectionRecord) -> String {
    format!(
        "--{service}-url http://{host}:{port} --{service}-username {user} --{service}-password {password}",
        host = record.hostname,
        port = record.port,
        user = record.user,
        password = record.password,
    )
}

fn add_option(options: &mut String, option: &str) {
    if !options.is_empty() {
        options.push(' ');
    }
    options.push_str(option);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn influxdb() -> ConnectionRecord {
        ConnectionRecord {
            hostname: "10.0.0.5".to_string(),
            port: "8086".to_string(),
            user: "admin".to_string(),
            password: "secret".to_string(),
        }
    }

    fn kapacitor() -> ConnectionRecord {
        ConnectionRecord {
            hostname: "10.0.0.6".to_string(),
            port: "9092".to_string(),
            user: "kap".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[test]
    fn empty_without_connections() {
        assert_eq!(build_options(&AgentState::default()), "");
    }

    #[test]
    fn influxdb_only() {
        let mut state = AgentState::default();
        state.store_connection(Service::Influxdb, influxdb());
        assert_eq!(
            build_options(&state),
            "--influxdb-url http://10.0.0.5:8086 --influxdb-username admin --influxdb-password secret"
        );
    }

    #[test]
    fn both_services_primary_first_regardless_of_arrival() {
        let mut kapacitor_first = AgentState::default();
        kapacitor_first.store_connection(Service::Kapacitor, kapacitor());
        kapacitor_first.store_connection(Service::Influxdb, influxdb());

        let mut influxdb_first = AgentState::default();
        influxdb_first.store_connection(Service::Influxdb, influxdb());
        influxdb_first.store_connection(Service::Kapacitor, kapacitor());

        let expected = "--influxdb-url http://10.0.0.5:8086 --influxdb-username admin --influxdb-password secret \
--kapacitor-url http://10.0.0.6:9092 --kapacitor-username kap --kapacitor-password hunter2";
        assert_eq!(build_options(&kapacitor_first), expected);
        assert_eq!(build_options(&influxdb_first), expected);
    }

    #[test]
    fn nulled_records_are_omitted() {
        let mut state = AgentState::default();
        state.null_connection(Service::Influxdb);
        state.store_connection(Service::Kapacitor, kapacitor());
        assert_eq!(
            build_options(&state),
            "--kapacitor-url http://10.0.0.6:9092 --kapacitor-username kap --kapacitor-password hunter2"
        );
    }
}
