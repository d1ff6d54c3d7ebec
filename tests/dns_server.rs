//! The DNS listener answering from the live record store.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use domain::base::iana::Rcode;
use domain::base::{Message, MessageBuilder, Name, Rtype};
use domain::rdata::A;
use subregsim::api::Api;
use subregsim::dns;
use subregsim::session::Credentials;
use subregsim::store::NewRecord;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tokio::time::timeout;

fn query(id: u16, qname: &str, qtype: Rtype) -> Vec<u8> {
    let mut msg = MessageBuilder::new_vec();
    msg.header_mut().set_id(id);
    let mut msg = msg.question();
    msg.push((Name::vec_from_str(qname).unwrap(), qtype)).unwrap();
    msg.finish()
}

async fn exchange(socket: &UdpSocket, request: &[u8]) -> Message<Vec<u8>> {
    socket.send(request).await.unwrap();
    let mut buf = vec![0u8; 4096];
    let len = timeout(Duration::from_secs(5), socket.recv(&mut buf))
        .await
        .expect("no DNS reply")
        .unwrap();
    buf.truncate(len);
    Message::from_octets(buf).unwrap()
}

fn a_record(name: &str, address: &str) -> NewRecord {
    NewRecord {
        name: Some(name.into()),
        record_type: Some("A".into()),
        content: Some(address.into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn answers_follow_the_store() {
    let api = Arc::new(Api::new(Credentials::new("user", "pass"), ["example.com"]));
    let ssid = api.login("user", "pass").into_result().unwrap().unwrap().ssid;

    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(dns::serve(socket, api.clone(), async move {
        let _ = stopped.await;
    }));

    let resolver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    resolver.connect(addr).await.unwrap();

    let response = exchange(&resolver, &query(1, "www.example.com", Rtype::A)).await;
    assert_eq!(response.header().id(), 1);
    assert_eq!(response.header().rcode(), Rcode::NXDOMAIN);

    assert!(api.add_dns_record(Some(&ssid), "example.com", a_record("www.example.com", "192.0.2.1")).is_ok());

    let response = exchange(&resolver, &query(2, "www.example.com", Rtype::A)).await;
    assert_eq!(response.header().rcode(), Rcode::NOERROR);
    let record = response.answer().unwrap().limit_to::<A>().next().unwrap().unwrap();
    assert_eq!(record.data().addr(), Ipv4Addr::new(192, 0, 2, 1));

    // the SOA serial counts the mutation
    let response = exchange(&resolver, &query(3, "example.com", Rtype::SOA)).await;
    assert_eq!(response.header_counts().ancount(), 1);
    assert!(api.zone().contains("( 2 86400 900 1209600 1800 )"));

    // junk is dropped without a reply, the next query still works
    resolver.send(b"junk").await.unwrap();
    let response = exchange(&resolver, &query(4, "www.example.com", Rtype::A)).await;
    assert_eq!(response.header().id(), 4);

    let _ = stop.send(());
    handle.await.unwrap().unwrap();
}
