#![allow(dead_code)]
use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::rdata::{A, SOA};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use minke_dns_infrastructure::dns::wire;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct MockUpstreamConfig {
    pub answers: HashMap<String, Ipv4Addr>,
    pub ttl: u32,
    pub delay: Duration,
    /// Unknown names get NOERROR plus an SOA with this minimum instead of NXDOMAIN.
    pub negative_soa_minimum: Option<u32>,
    pub silent: bool,
    pub rcode: ResponseCode,
    /// Set TC on every reply.
    pub truncated: bool,
}

impl Default for MockUpstreamConfig {
    fn default() -> Self {
        Self {
            answers: HashMap::new(),
            ttl: 300,
            delay: Duration::ZERO,
            negative_soa_minimum: None,
            silent: false,
            rcode: ResponseCode::NoError,
            truncated: false,
        }
    }
}

impl MockUpstreamConfig {
    pub fn answering(name: &str, ip: Ipv4Addr) -> Self {
        let mut config = Self::default();
        config.answers.insert(name.to_string(), ip);
        config
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Self::default()
        }
    }
}

/// Scripted upstream resolver listening on UDP and TCP at the same port.
pub struct MockUpstream {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    sources: Arc<Mutex<Vec<SocketAddr>>>,
    tasks: Vec<JoinHandle<()>>,
}

impl MockUpstream {
    pub async fn start(config: MockUpstreamConfig) -> Self {
        Self::start_on(IpAddr::V4(Ipv4Addr::LOCALHOST), config).await
    }

    pub async fn start_on(ip: IpAddr, config: MockUpstreamConfig) -> Self {
        let udp = UdpSocket::bind(SocketAddr::new(ip, 0)).await.unwrap();
        let addr = udp.local_addr().unwrap();
        let tcp = TcpListener::bind(addr).await.unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        let sources = Arc::new(Mutex::new(Vec::new()));
        let config = Arc::new(config);

        let udp_task = {
            let (hits, sources, config) = (hits.clone(), sources.clone(), config.clone());
            tokio::spawn(async move {
                let udp = Arc::new(udp);
                let mut buf = vec![0u8; 4096];
                loop {
                    let Ok((len, peer)) = udp.recv_from(&mut buf).await else {
                        continue;
                    };
                    hits.fetch_add(1, Ordering::SeqCst);
                    sources.lock().unwrap().push(peer);
                    if config.silent {
                        continue;
                    }
                    let Ok(request) = Message::from_vec(&buf[..len]) else {
                        continue;
                    };
                    let (udp, config) = (udp.clone(), config.clone());
                    tokio::spawn(async move {
                        tokio::time::sleep(config.delay).await;
                        let reply = wire::encode(&respond(&config, &request)).unwrap();
                        let _ = udp.send_to(&reply, peer).await;
                    });
                }
            })
        };

        let tcp_task = {
            let (hits, sources, config) = (hits.clone(), sources.clone(), config.clone());
            tokio::spawn(async move {
                loop {
                    let Ok((mut stream, peer)) = tcp.accept().await else {
                        continue;
                    };
                    hits.fetch_add(1, Ordering::SeqCst);
                    sources.lock().unwrap().push(peer);
                    let config = config.clone();
                    tokio::spawn(async move {
                        let Ok(bytes) = wire::read_framed(&mut stream).await else {
                            return;
                        };
                        if config.silent {
                            tokio::time::sleep(Duration::from_secs(30)).await;
                            return;
                        }
                        let Ok(request) = Message::from_vec(&bytes) else {
                            return;
                        };
                        tokio::time::sleep(config.delay).await;
                        let reply = wire::encode(&respond(&config, &request)).unwrap();
                        let _ = wire::write_framed(&mut stream, &reply).await;
                    });
                }
            })
        };

        Self {
            addr,
            hits,
            sources,
            tasks: vec![udp_task, tcp_task],
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn sources(&self) -> Vec<SocketAddr> {
        self.sources.lock().unwrap().clone()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn respond(config: &MockUpstreamConfig, request: &Message) -> Message {
    let mut response = Message::new(request.id(), MessageType::Response, request.op_code());
    response.set_recursion_desired(request.recursion_desired());
    response.set_recursion_available(true);
    for query in request.queries() {
        response.add_query(query.clone());
    }

    if config.rcode != ResponseCode::NoError {
        response.set_response_code(config.rcode);
        return response;
    }

    let Some(question) = request.queries().first() else {
        response.set_response_code(ResponseCode::FormErr);
        return response;
    };
    let name = question
        .name()
        .to_string()
        .trim_end_matches('.')
        .to_ascii_lowercase();

    match config.answers.get(&name) {
        Some(ip) if question.query_type() == RecordType::A => {
            response.add_answer(Record::from_rdata(
                question.name().clone(),
                config.ttl,
                RData::A(A(*ip)),
            ));
        }
        Some(_) => {}
        None => match config.negative_soa_minimum {
            Some(minimum) => {
                response.add_name_server(soa_record("example", minimum));
            }
            None => {
                response.set_response_code(ResponseCode::NXDomain);
            }
        },
    }
    response.set_truncated(config.truncated);
    response
}

pub fn soa_record(zone: &str, minimum: u32) -> Record {
    let name = Name::from_str(&format!("{}.", zone)).unwrap();
    let mname = Name::from_str(&format!("ns1.{}.", zone)).unwrap();
    let rname = Name::from_str(&format!("hostmaster.{}.", zone)).unwrap();
    let soa = SOA::new(mname, rname, 1, 3600, 900, 604800, minimum);
    Record::from_rdata(name, 3600, RData::SOA(soa))
}
