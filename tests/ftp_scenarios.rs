//! End-to-end control-channel scenarios (spec.md §8, S1–S6), driven over a
//! real loopback `Server`, following the teacher crate's
//! `tests/appe.rs`/`tests/rename.rs` style: raw reads/writes against a
//! `TcpStream`, no FTP client crate.

mod common;

use std::time::{SystemTime, UNIX_EPOCH};

use common::{connect, parse_pasv, read_all, read_reply, send_line, spawn_server};
use miniftpd::auth::{DirRule, DirRuleAttrs, User};
use miniftpd::config::Config;
use tokio::io::AsyncWriteExt;

fn unique_dir(prefix: &str) -> std::path::PathBuf {
    let ts = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    std::env::temp_dir().join(format!("miniftpd-{prefix}-{ts}"))
}

#[tokio::test(flavor = "multi_thread")]
async fn s1_anonymous_login_and_pwd() {
    let home = unique_dir("s1");
    tokio::fs::create_dir_all(&home).await.unwrap();

    let mut config = Config::default();
    config.add_user(User::anonymous(home.as_path()));
    let addr = spawn_server(config).await;

    let stream = connect(addr).await;
    let mut buf = [0u8; 1024];

    assert!(read_reply(&mut buf, &stream).await.starts_with("220"));
    send_line(&stream, "USER anonymous").await;
    assert_eq!(read_reply(&mut buf, &stream).await, "331 User ANONYMOUS okay, use email as password.\r\n");
    send_line(&stream, "PASS foo@bar").await;
    assert!(read_reply(&mut buf, &stream).await.starts_with("230"));
    send_line(&stream, "PWD").await;
    assert_eq!(read_reply(&mut buf, &stream).await, "257 \"/\" is current directory.\r\n");
    send_line(&stream, "QUIT").await;
    assert!(read_reply(&mut buf, &stream).await.starts_with("221"));

    tokio::fs::remove_dir_all(&home).await.unwrap();
}

async fn login(stream: &tokio::net::TcpStream, buf: &mut [u8], name: &str, password: &str) {
    assert!(read_reply(buf, stream).await.starts_with("220"));
    send_line(stream, &format!("USER {name}")).await;
    assert!(read_reply(buf, stream).await.starts_with("331"));
    send_line(stream, &format!("PASS {password}")).await;
    assert!(read_reply(buf, stream).await.starts_with("230"));
}

#[tokio::test(flavor = "multi_thread")]
async fn s2_passive_list_of_empty_home() {
    let home = unique_dir("s2");
    tokio::fs::create_dir_all(&home).await.unwrap();

    let mut config = Config::default();
    config.add_user(User::anonymous(home.as_path()));
    let addr = spawn_server(config).await;

    let stream = connect(addr).await;
    let mut buf = [0u8; 1024];
    login(&stream, &mut buf, "anonymous", "x@y").await;

    send_line(&stream, "TYPE I").await;
    assert!(read_reply(&mut buf, &stream).await.starts_with("200"));

    send_line(&stream, "PASV").await;
    let reply = read_reply(&mut buf, &stream).await;
    assert!(reply.starts_with("227"));
    let data_addr = parse_pasv(reply);

    send_line(&stream, "LIST").await;
    let data_stream = connect(data_addr).await;
    assert!(read_reply(&mut buf, &stream).await.starts_with("150"));

    let payload = read_all(&data_stream).await;
    assert!(payload.is_empty());
    assert!(read_reply(&mut buf, &stream).await.starts_with("226"));

    tokio::fs::remove_dir_all(&home).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn s3_rest_and_retr_delivers_byte_range() {
    let home = unique_dir("s3");
    tokio::fs::create_dir_all(&home).await.unwrap();
    tokio::fs::write(home.join("f"), b"hello\nworld").await.unwrap();

    let mut config = Config::default();
    config.add_user(User::anonymous(home.as_path()));
    let addr = spawn_server(config).await;

    let stream = connect(addr).await;
    let mut buf = [0u8; 1024];
    login(&stream, &mut buf, "anonymous", "x@y").await;

    send_line(&stream, "TYPE I").await;
    assert!(read_reply(&mut buf, &stream).await.starts_with("200"));

    send_line(&stream, "PASV").await;
    let reply = read_reply(&mut buf, &stream).await;
    let data_addr = parse_pasv(reply);

    send_line(&stream, "REST 6").await;
    assert!(read_reply(&mut buf, &stream).await.starts_with("350"));

    send_line(&stream, "RETR f").await;
    let data_stream = connect(data_addr).await;
    assert!(read_reply(&mut buf, &stream).await.starts_with("150"));

    let payload = read_all(&data_stream).await;
    assert_eq!(payload, b"world");
    assert!(read_reply(&mut buf, &stream).await.starts_with("226"));

    tokio::fs::remove_dir_all(&home).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn s4_rnto_without_rnfr_is_bad_sequence() {
    let home = unique_dir("s4");
    tokio::fs::create_dir_all(&home).await.unwrap();

    let mut config = Config::default();
    config.add_user(User::anonymous(home.as_path()));
    let addr = spawn_server(config).await;

    let stream = connect(addr).await;
    let mut buf = [0u8; 1024];
    login(&stream, &mut buf, "anonymous", "x@y").await;

    send_line(&stream, "RNTO x").await;
    assert!(read_reply(&mut buf, &stream).await.starts_with("503"));

    tokio::fs::remove_dir_all(&home).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn s5_permission_gated_mkd_is_denied() {
    let home = unique_dir("s5");
    tokio::fs::create_dir_all(&home).await.unwrap();

    let mut user = User::new("limited", home.as_path(), DirRuleAttrs::default_root(), 5).with_password("pw");
    user.add_rule(DirRule::new("/", home.as_path()).with_permission("elr"));
    let mut config = Config::default();
    config.add_user(user);
    let addr = spawn_server(config).await;

    let stream = connect(addr).await;
    let mut buf = [0u8; 1024];
    login(&stream, &mut buf, "limited", "pw").await;

    send_line(&stream, "MKD newdir").await;
    assert!(read_reply(&mut buf, &stream).await.starts_with("550"));
    assert!(!home.join("newdir").exists());

    tokio::fs::remove_dir_all(&home).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn s6_parent_escape_is_clamped_at_root() {
    let home = unique_dir("s6");
    tokio::fs::create_dir_all(home.join("sub")).await.unwrap();

    let mut config = Config::default();
    config.add_user(User::anonymous(home.as_path()));
    let addr = spawn_server(config).await;

    let stream = connect(addr).await;
    let mut buf = [0u8; 1024];
    login(&stream, &mut buf, "anonymous", "x@y").await;

    send_line(&stream, "CWD sub").await;
    assert!(read_reply(&mut buf, &stream).await.starts_with("250"));

    send_line(&stream, "CWD ../../../..").await;
    assert!(read_reply(&mut buf, &stream).await.starts_with("250"));

    send_line(&stream, "PWD").await;
    assert_eq!(read_reply(&mut buf, &stream).await, "257 \"/\" is current directory.\r\n");

    tokio::fs::remove_dir_all(&home).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn pre_login_command_other_than_user_pass_quit_is_rejected() {
    let home = unique_dir("pre-login");
    tokio::fs::create_dir_all(&home).await.unwrap();

    let mut config = Config::default();
    config.add_user(User::anonymous(home.as_path()));
    let addr = spawn_server(config).await;

    let stream = connect(addr).await;
    let mut buf = [0u8; 1024];
    assert!(read_reply(&mut buf, &stream).await.starts_with("220"));

    send_line(&stream, "PWD").await;
    assert!(read_reply(&mut buf, &stream).await.starts_with("530"));

    // FEAT/OPTS are marked "Auth required: no" in spec.md §4.7's per-command
    // table, but §4.2/§8 invariant 7 and the original implementation reject
    // everything but USER/PASS/QUIT before login — including these.
    send_line(&stream, "FEAT").await;
    assert!(read_reply(&mut buf, &stream).await.starts_with("530"));

    send_line(&stream, "OPTS UTF8 ON").await;
    assert!(read_reply(&mut buf, &stream).await.starts_with("530"));

    tokio::fs::remove_dir_all(&home).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn stor_then_retr_roundtrips_binary_content() {
    let home = unique_dir("stor-retr");
    tokio::fs::create_dir_all(&home).await.unwrap();

    let mut config = Config::default();
    config.add_user(User::anonymous(home.as_path()));
    let addr = spawn_server(config).await;

    let stream = connect(addr).await;
    let mut buf = [0u8; 1024];
    login(&stream, &mut buf, "anonymous", "x@y").await;
    send_line(&stream, "TYPE I").await;
    assert!(read_reply(&mut buf, &stream).await.starts_with("200"));

    send_line(&stream, "PASV").await;
    let data_addr = parse_pasv(read_reply(&mut buf, &stream).await);
    send_line(&stream, "STOR roundtrip.bin").await;
    let mut data_stream = connect(data_addr).await;
    assert!(read_reply(&mut buf, &stream).await.starts_with("150"));
    data_stream.write_all(b"roundtrip payload").await.unwrap();
    data_stream.shutdown().await.unwrap();
    drop(data_stream);
    assert!(read_reply(&mut buf, &stream).await.starts_with("226"));

    send_line(&stream, "PASV").await;
    let data_addr = parse_pasv(read_reply(&mut buf, &stream).await);
    send_line(&stream, "RETR roundtrip.bin").await;
    let data_stream = connect(data_addr).await;
    assert!(read_reply(&mut buf, &stream).await.starts_with("150"));
    let payload = read_all(&data_stream).await;
    assert_eq!(payload, b"roundtrip payload");
    assert!(read_reply(&mut buf, &stream).await.starts_with("226"));

    tokio::fs::remove_dir_all(&home).await.unwrap();
}
