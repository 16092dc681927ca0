use jpake::{derive_s, JpakeThreePass, Pass2Result, Result, Round1Result, Round2Result};
use std::io::{Read, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::thread;

fn main() -> Result<()> {
    // example password, never use this...
    const PASSWORD: &str = "g04tEd_c4pT41N";

    // the socket address for the responder to bind to
    let responder_socket: SocketAddr =
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8236);
    let listener = TcpListener::bind(responder_socket).unwrap();

    // spawn a thread for the responder
    let responder_thread = thread::spawn(move || -> Result<[u8; 32]> {
        let (mut stream, _initiator_addr) = listener.accept().unwrap();

        // buffer for receiving packets
        let mut buf = [0u8; 1024];

        let mut responder = JpakeThreePass::new("server.example.com")?;
        let s = derive_s(PASSWORD)?;

        // ===== Pass 1 =====
        let bytes_received = stream.read(&mut buf).unwrap();
        let pass1: Round1Result = bincode::deserialize(&buf[..bytes_received]).unwrap();
        println!("[responder] received pass 1");

        // ===== Pass 2 =====
        let pass2 = responder.pass2(&pass1, &s, "jlpicard_1701")?;
        stream
            .write_all(&bincode::serialize(&pass2).unwrap())
            .unwrap();
        println!("[responder] sent pass 2");

        // ===== Pass 3 =====
        let bytes_received = stream.read(&mut buf).unwrap();
        let pass3: Round2Result = bincode::deserialize(&buf[..bytes_received]).unwrap();
        responder.receive_pass3(&pass3)?;
        println!("[responder] received pass 3");

        responder.derive_shared_key()
    });

    // spawn a thread for the initiator
    let initiator_thread = thread::spawn(move || -> Result<[u8; 32]> {
        let mut stream = TcpStream::connect(responder_socket).unwrap();
        let mut buf = [0u8; 1024];

        let mut initiator = JpakeThreePass::new("jlpicard_1701")?;
        let s = derive_s(PASSWORD)?;

        // ===== Pass 1 =====
        let pass1 = initiator.pass1()?;
        stream
            .write_all(&bincode::serialize(&pass1).unwrap())
            .unwrap();
        println!("[initiator] sent pass 1");

        // ===== Pass 2 =====
        let bytes_received = stream.read(&mut buf).unwrap();
        let pass2: Pass2Result = bincode::deserialize(&buf[..bytes_received]).unwrap();
        println!("[initiator] received pass 2");

        // ===== Pass 3 =====
        let pass3 = initiator.pass3(&pass2, &s, "server.example.com")?;
        stream
            .write_all(&bincode::serialize(&pass3).unwrap())
            .unwrap();
        println!("[initiator] sent pass 3");

        initiator.derive_shared_key()
    });

    // assert that both threads arrived at the same key
    let initiator_key = initiator_thread.join().unwrap()?;
    let responder_key = responder_thread.join().unwrap()?;
    assert_eq!(initiator_key, responder_key);
    println!(
        "Negotiation finished, both parties arrived at a key of: {}",
        hex::encode(initiator_key)
    );

    Ok(())
}
