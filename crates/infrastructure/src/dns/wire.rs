//! Wire-format glue around `hickory-proto`.
//!
//! UDP carries one message per datagram. TCP prefixes every message with a
//! 2-byte big-endian length (RFC 1035 §4.2.2).

use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::Name;
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use minke_dns_application::ports::Answer;
use minke_dns_domain::DomainError;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub const MAX_MESSAGE_SIZE: usize = 65535;

const IPV4_REVERSE_SUFFIX: &str = ".in-addr.arpa";
const IPV6_REVERSE_SUFFIX: &str = ".ip6.arpa";

pub fn decode(bytes: &[u8]) -> Result<Message, DomainError> {
    Message::from_vec(bytes).map_err(|e| DomainError::MalformedPacket(e.to_string()))
}

pub fn encode(message: &Message) -> Result<Vec<u8>, DomainError> {
    let mut buf = Vec::with_capacity(512);
    let mut encoder = BinEncoder::new(&mut buf);
    message.emit(&mut encoder).map_err(|e| {
        DomainError::MalformedPacket(format!("Failed to serialize DNS message: {}", e))
    })?;
    Ok(buf)
}

/// Response skeleton for `request`: same id, opcode, RD bit and question.
pub fn response_for(request: &Message) -> Message {
    let mut response = Message::new(request.id(), MessageType::Response, request.op_code());
    response.set_recursion_desired(request.recursion_desired());
    response.set_recursion_available(true);
    for query in request.queries() {
        response.add_query(query.clone());
    }
    response
}

/// Copy an answer's sections and flags into a response skeleton.
pub fn apply_answer(response: &mut Message, answer: &Answer) {
    for record in &answer.answers {
        response.add_answer(record.clone());
    }
    for record in &answer.authorities {
        response.add_name_server(record.clone());
    }
    for record in &answer.additionals {
        response.add_additional(record.clone());
    }
    response.set_authoritative(answer.authoritative);
    response.set_truncated(answer.truncated);
    response.set_response_code(answer.response_code);
}

/// SERVFAIL for a packet that could not be decoded. The transaction id is
/// lifted from the raw bytes when at least two are present.
pub fn servfail_for_raw(bytes: &[u8]) -> Vec<u8> {
    let id = match bytes {
        [hi, lo, ..] => u16::from_be_bytes([*hi, *lo]),
        _ => 0,
    };

    let mut message = Message::new(id, MessageType::Response, OpCode::Query);
    message.set_recursion_available(true);
    message.set_response_code(ResponseCode::ServFail);

    encode(&message).unwrap_or_else(|_| {
        let [hi, lo] = id.to_be_bytes();
        vec![hi, lo, 0x80, 0x82, 0, 0, 0, 0, 0, 0, 0, 0]
    })
}

pub async fn write_framed<S>(stream: &mut S, message_bytes: &[u8]) -> Result<(), DomainError>
where
    S: AsyncWriteExt + Unpin,
{
    if message_bytes.len() > MAX_MESSAGE_SIZE {
        return Err(DomainError::MalformedPacket(format!(
            "Message too large for TCP framing: {} bytes",
            message_bytes.len()
        )));
    }

    let length = (message_bytes.len() as u16).to_be_bytes();
    stream
        .write_all(&length)
        .await
        .map_err(|e| DomainError::IoError(format!("Failed to write length prefix: {}", e)))?;
    stream
        .write_all(message_bytes)
        .await
        .map_err(|e| DomainError::IoError(format!("Failed to write DNS message: {}", e)))?;
    stream
        .flush()
        .await
        .map_err(|e| DomainError::IoError(format!("Failed to flush stream: {}", e)))?;

    Ok(())
}

pub async fn read_framed<S>(stream: &mut S) -> Result<Vec<u8>, DomainError>
where
    S: AsyncReadExt + Unpin,
{
    let mut len_buf = [0u8; 2];
    stream
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| DomainError::IoError(format!("Failed to read message length: {}", e)))?;

    let message_len = u16::from_be_bytes(len_buf) as usize;
    if message_len == 0 {
        return Err(DomainError::MalformedPacket(
            "Zero-length TCP message".to_string(),
        ));
    }

    let mut message = vec![0u8; message_len];
    stream
        .read_exact(&mut message)
        .await
        .map_err(|e| DomainError::IoError(format!("Failed to read DNS message: {}", e)))?;

    Ok(message)
}

/// Lower-cased name without the trailing root dot.
pub fn normalize_name(name: &Name) -> String {
    let mut text = name.to_string();
    if text.ends_with('.') {
        text.pop();
    }
    text.to_ascii_lowercase()
}

pub fn parse_name(name: &str) -> Result<Name, DomainError> {
    let fqdn = if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{}.", name)
    };
    Name::from_ascii(&fqdn).map_err(|e| DomainError::InvalidDomainName(format!("{}: {}", name, e)))
}

/// Address encoded by a normalized `in-addr.arpa` or `ip6.arpa` name.
pub fn ip_from_reverse_name(name: &str) -> Option<IpAddr> {
    if let Some(labels) = name.strip_suffix(IPV4_REVERSE_SUFFIX) {
        let mut octets = [0u8; 4];
        let parts: Vec<&str> = labels.split('.').collect();
        if parts.len() != 4 {
            return None;
        }
        for (slot, part) in octets.iter_mut().rev().zip(parts) {
            *slot = part.parse().ok()?;
        }
        return Some(IpAddr::V4(Ipv4Addr::from(octets)));
    }

    if let Some(labels) = name.strip_suffix(IPV6_REVERSE_SUFFIX) {
        let nibbles: Vec<&str> = labels.split('.').collect();
        if nibbles.len() != 32 {
            return None;
        }
        let mut value: u128 = 0;
        for nibble in nibbles.iter().rev() {
            if nibble.len() != 1 {
                return None;
            }
            let digit = u8::from_str_radix(nibble, 16).ok()?;
            value = (value << 4) | u128::from(digit);
        }
        return Some(IpAddr::V6(Ipv6Addr::from(value)));
    }

    None
}

pub fn reverse_name_for(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, d] = v4.octets();
            format!("{}.{}.{}.{}{}", d, c, b, a, IPV4_REVERSE_SUFFIX)
        }
        IpAddr::V6(v6) => {
            let value = u128::from(v6);
            let mut labels = Vec::with_capacity(32);
            for shift in 0..32 {
                labels.push(format!("{:x}", (value >> (shift * 4)) & 0xf));
            }
            format!("{}{}", labels.join("."), IPV6_REVERSE_SUFFIX)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::op::Query;
    use hickory_proto::rr::RecordType;

    #[test]
    fn test_servfail_keeps_transaction_id() {
        let reply = decode(&servfail_for_raw(&[0xab, 0xcd, 0x01])).unwrap();
        assert_eq!(reply.id(), 0xabcd);
        assert_eq!(reply.response_code(), ResponseCode::ServFail);
    }

    #[test]
    fn test_servfail_for_single_byte_uses_zero_id() {
        let reply = decode(&servfail_for_raw(&[0x42])).unwrap();
        assert_eq!(reply.id(), 0);
        assert_eq!(reply.message_type(), MessageType::Response);
    }

    #[test]
    fn test_response_copies_question() {
        let mut request = Message::new(7, MessageType::Query, OpCode::Query);
        request.set_recursion_desired(true);
        request.add_query(Query::query(parse_name("myself").unwrap(), RecordType::A));

        let response = response_for(&request);

        assert_eq!(response.id(), 7);
        assert!(response.recursion_desired());
        assert!(response.recursion_available());
        assert_eq!(response.queries().len(), 1);
        assert_eq!(normalize_name(response.queries()[0].name()), "myself");
    }

    #[test]
    fn test_ipv4_reverse_name() {
        let ip = ip_from_reverse_name("2.1.10.10.in-addr.arpa").unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(10, 10, 1, 2)));
        assert_eq!(reverse_name_for(ip), "2.1.10.10.in-addr.arpa");
    }

    #[test]
    fn test_ipv6_reverse_name() {
        let ip: IpAddr = "fd00::1:2".parse().unwrap();
        let name = reverse_name_for(ip);
        assert!(name.starts_with("2.0.0.0.1.0.0.0."));
        assert_eq!(ip_from_reverse_name(&name), Some(ip));
    }

    #[test]
    fn test_reverse_name_rejects_garbage() {
        assert_eq!(ip_from_reverse_name("1.10.10.in-addr.arpa"), None);
        assert_eq!(ip_from_reverse_name("x.1.10.10.in-addr.arpa"), None);
        assert_eq!(ip_from_reverse_name("example.com"), None);
    }

    #[tokio::test]
    async fn test_framing_over_duplex() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        write_framed(&mut client, b"hello").await.unwrap();
        assert_eq!(read_framed(&mut server).await.unwrap(), b"hello");
    }
}
