//! Service detection based on well-known port numbers.
//!
//! The table is an immutable value handed to each scanner (usually behind an
//! `Arc`) rather than a process-wide static, so callers and tests can supply
//! their own mapping.

use std::collections::HashMap;

/// Name reported when neither a banner nor the table identifies a service.
pub const UNKNOWN_SERVICE: &str = "unknown";

/// Well-known ports and the services usually found on them.
const WELL_KNOWN: &[(u16, &str)] = &[
    (20, "FTP Data"),
    (21, "FTP Control"),
    (22, "SSH"),
    (23, "Telnet"),
    (25, "SMTP"),
    (53, "DNS"),
    (67, "DHCP Server"),
    (68, "DHCP Client"),
    (69, "TFTP"),
    (80, "HTTP"),
    (88, "Kerberos"),
    (110, "POP3"),
    (111, "RPCBind"),
    (119, "NNTP"),
    (123, "NTP"),
    (135, "MS RPC"),
    (137, "NetBIOS Name Service"),
    (138, "NetBIOS Datagram Service"),
    (139, "NetBIOS Session Service"),
    (143, "IMAP"),
    (161, "SNMP"),
    (162, "SNMP Trap"),
    (179, "BGP"),
    (194, "IRC"),
    (389, "LDAP"),
    (443, "HTTPS"),
    (445, "Microsoft-DS"),
    (465, "SMTPS"),
    (500, "ISAKMP"),
    (514, "Syslog"),
    (515, "LPD"),
    (554, "RTSP"),
    (587, "Submission"),
    (631, "IPP"),
    (636, "LDAPS"),
    (873, "Rsync"),
    (993, "IMAPS"),
    (995, "POP3S"),
    (1080, "SOCKS"),
    (1194, "OpenVPN"),
    (1433, "MSSQL"),
    (1434, "MSSQL Monitor"),
    (1521, "Oracle"),
    (1723, "PPTP"),
    (1883, "MQTT"),
    (1900, "SSDP"),
    (2049, "NFS"),
    (2082, "cPanel"),
    (2083, "cPanel Secure"),
    (2375, "Docker"),
    (2376, "Docker Secure"),
    (2483, "Oracle DB"),
    (2484, "Oracle DB Secure"),
    (3128, "Squid"),
    (3306, "MySQL"),
    (3389, "RDP"),
    (3690, "Subversion"),
    (4444, "Metasploit"),
    (4848, "GlassFish Admin"),
    (5060, "SIP"),
    (5432, "PostgreSQL"),
    (5632, "pcAnywhere"),
    (5672, "AMQP"),
    (5900, "VNC"),
    (5984, "CouchDB"),
    (6379, "Redis"),
    (6443, "Kubernetes API"),
    (6667, "IRC"),
    (8000, "Common HTTP Alt"),
    (8080, "HTTP Proxy"),
    (8086, "InfluxDB"),
    (8181, "HTTP Proxy"),
    (8443, "HTTPS Alt"),
    (8888, "HTTP Proxy"),
    (9000, "SonarQube"),
    (9042, "Cassandra"),
    (9092, "Kafka"),
    (9200, "Elasticsearch"),
    (9300, "Elasticsearch"),
    (11211, "Memcached"),
    (27017, "MongoDB"),
    (27018, "MongoDB"),
    (27019, "MongoDB"),
    (50000, "SAP"),
    (50070, "Hadoop"),
];

/// Read-only mapping from port number to service name.
#[derive(Debug, Clone, Default)]
pub struct ServiceTable {
    entries: HashMap<u16, String>,
}

impl ServiceTable {
    /// A table with no entries; every lookup resolves to "unknown".
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in table of well-known ports.
    pub fn well_known() -> Self {
        Self::from_entries(WELL_KNOWN.iter().map(|&(port, name)| (port, name.to_string())))
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (u16, String)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Layer user-supplied names over this table. Empty names are ignored.
    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = (u16, String)>) -> Self {
        for (port, name) in overrides {
            let name = name.trim();
            if !name.is_empty() {
                self.entries.insert(port, name.to_string());
            }
        }
        self
    }

    /// Look up the probable service name for a given port.
    pub fn lookup(&self, port: u16) -> Option<&str> {
        self.entries.get(&port).map(String::as_str)
    }

    /// Service name for `port`, or "unknown" when the port is not listed.
    pub fn resolve(&self, port: u16) -> &str {
        self.lookup(port).unwrap_or(UNKNOWN_SERVICE)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
