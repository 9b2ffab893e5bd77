use modis::Server;
use respite::{RespReader, RespValue, RespWriter};
use tokio::{
    io::{DuplexStream, ReadHalf, WriteHalf, duplex},
    time::{Duration, sleep, timeout},
};

/// How long do we wait before a test times out?
const TIMEOUT: Duration = Duration::from_millis(500);

struct TestClient {
    reader: RespReader<ReadHalf<DuplexStream>>,
    writer: RespWriter<WriteHalf<DuplexStream>>,
}

impl TestClient {
    fn connect(server: &Server) -> Self {
        let (local, remote) = duplex(1 << 16);
        server.connect(remote, None);
        let (reader, writer) = tokio::io::split(local);
        TestClient {
            reader: RespReader::new(reader, Default::default()),
            writer: RespWriter::new(writer),
        }
    }

    async fn send(&mut self, args: &[&[u8]]) {
        self.writer.write_array(args.len()).await.unwrap();
        for arg in args {
            self.writer.write_blob_string(arg).await.unwrap();
        }
        self.writer.flush().await.unwrap();
    }

    async fn read(&mut self) -> RespValue {
        timeout(TIMEOUT, self.reader.value())
            .await
            .expect("timed out waiting for a reply")
            .unwrap()
            .expect("connection closed")
    }

    async fn run(&mut self, args: &[&[u8]]) -> RespValue {
        self.send(args).await;
        self.read().await
    }
}

#[track_caller]
fn int(value: &RespValue) -> i64 {
    value
        .integer()
        .unwrap_or_else(|| panic!("expected integer, got {value:?}"))
}

#[track_caller]
fn text(value: &RespValue) -> String {
    match value {
        RespValue::String(s) => String::from_utf8(s.to_vec()).unwrap(),
        other => panic!("expected string, got {other:?}"),
    }
}

#[track_caller]
fn error(value: &RespValue) -> String {
    match value {
        RespValue::Error(e) => String::from_utf8(e.to_vec()).unwrap(),
        other => panic!("expected error, got {other:?}"),
    }
}

#[track_caller]
fn array(value: &RespValue) -> &Vec<RespValue> {
    match value {
        RespValue::Array(values) => values,
        other => panic!("expected array, got {other:?}"),
    }
}

fn is_nil(value: &RespValue) -> bool {
    matches!(value, RespValue::Nil)
}

#[tokio::test]
async fn ping_and_echo() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    assert_eq!(text(&client.run(&[b"PING"]).await), "PONG");
    assert_eq!(text(&client.run(&[b"ping", b"hey"]).await), "hey");
    assert_eq!(text(&client.run(&[b"ECHO", b"hello"]).await), "hello");

    let reply = client.run(&[b"ECHO"]).await;
    assert_eq!(
        error(&reply),
        "ERR wrong number of arguments for 'echo' command"
    );
}

#[tokio::test]
async fn unknown_command() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);
    assert_eq!(error(&client.run(&[b"FLUSHDB"]).await), "ERR unknown command");
}

#[tokio::test]
async fn set_get_nx() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    assert_eq!(text(&client.run(&[b"SET", b"alpha", b"bravo"]).await), "OK");
    assert_eq!(text(&client.run(&[b"GET", b"alpha"]).await), "bravo");

    let reply = client.run(&[b"SET", b"alpha", b"other", b"NX"]).await;
    assert!(is_nil(&reply), "{reply:?}");
    assert_eq!(text(&client.run(&[b"GET", b"alpha"]).await), "bravo");

    let reply = client.run(&[b"SET", b"missing", b"x", b"XX"]).await;
    assert!(is_nil(&reply), "{reply:?}");

    assert_eq!(
        text(&client.run(&[b"SET", b"alpha", b"charlie", b"XX"]).await),
        "OK"
    );
    assert_eq!(text(&client.run(&[b"GET", b"alpha"]).await), "charlie");

    let reply = client.run(&[b"SET", b"k", b"v", b"NX", b"XX"]).await;
    assert_eq!(error(&reply), "ERR syntax error");
}

#[tokio::test]
async fn set_with_expiry() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    assert_eq!(
        text(&client.run(&[b"SET", b"k", b"v", b"EX", b"100"]).await),
        "OK"
    );
    let ttl = int(&client.run(&[b"TTL", b"k"]).await);
    assert!((1..=100).contains(&ttl), "{ttl}");

    // A plain SET clears the expiry.
    assert_eq!(text(&client.run(&[b"SET", b"k", b"v"]).await), "OK");
    assert_eq!(int(&client.run(&[b"TTL", b"k"]).await), -1);

    assert_eq!(int(&client.run(&[b"TTL", b"missing"]).await), -2);
}

#[tokio::test]
async fn expire_and_ttl() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    client.run(&[b"SET", b"k", b"v"]).await;
    assert_eq!(int(&client.run(&[b"EXPIRE", b"k", b"100"]).await), 1);
    let pttl = int(&client.run(&[b"PTTL", b"k"]).await);
    assert!((1..=100_000).contains(&pttl), "{pttl}");

    assert_eq!(int(&client.run(&[b"EXPIRE", b"missing", b"100"]).await), 0);

    // An expiry in the past removes the key.
    assert_eq!(int(&client.run(&[b"PEXPIRE", b"k", b"-1"]).await), 1);
    assert_eq!(int(&client.run(&[b"EXISTS", b"k"]).await), 0);
}

#[tokio::test]
async fn mget_mix() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    client.run(&[b"SET", b"one", b"1"]).await;
    client.run(&[b"SET", b"three", b"3"]).await;

    let reply = client.run(&[b"MGET", b"one", b"two", b"three"]).await;
    let values = array(&reply);
    assert_eq!(values.len(), 3);
    assert_eq!(text(&values[0]), "1");
    assert!(is_nil(&values[1]));
    assert_eq!(text(&values[2]), "3");
}

#[tokio::test]
async fn incr_family() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    assert_eq!(int(&client.run(&[b"INCR", b"n"]).await), 1);
    assert_eq!(int(&client.run(&[b"INCRBY", b"n", b"9"]).await), 10);
    assert_eq!(int(&client.run(&[b"DECR", b"n"]).await), 9);
    assert_eq!(int(&client.run(&[b"DECRBY", b"n", b"4"]).await), 5);
    assert_eq!(text(&client.run(&[b"GET", b"n"]).await), "5");

    client.run(&[b"SET", b"counter", b"not-a-number"]).await;
    let reply = client.run(&[b"INCRBY", b"counter", b"1"]).await;
    assert_eq!(error(&reply), "ERR value is not an integer or out of range");
}

#[tokio::test]
async fn integer_arguments_parse_exactly() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    client.run(&[b"SET", b"k", b"10"]).await;

    // Leading `+`, leading zeros and stray spaces are not integers.
    let reply = client.run(&[b"EXPIRE", b"k", b"+100"]).await;
    assert_eq!(error(&reply), "ERR value is not an integer or out of range");
    let reply = client.run(&[b"INCRBY", b"k", b"007"]).await;
    assert_eq!(error(&reply), "ERR value is not an integer or out of range");
    let reply = client.run(&[b"INCRBY", b"k", b" 1"]).await;
    assert_eq!(error(&reply), "ERR value is not an integer or out of range");
    let reply = client.run(&[b"LINDEX", b"l", b"+0"]).await;
    assert_eq!(error(&reply), "ERR value is not an integer or out of range");

    // Nothing above touched the key.
    assert_eq!(text(&client.run(&[b"GET", b"k"]).await), "10");
    assert_eq!(int(&client.run(&[b"TTL", b"k"]).await), -1);
}

#[tokio::test]
async fn wrong_type_is_rejected() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    client.run(&[b"SET", b"s", b"v"]).await;
    let reply = client.run(&[b"LPUSH", b"s", b"x"]).await;
    assert_eq!(
        error(&reply),
        "WRONGTYPE Operation against a key holding the wrong kind of value"
    );

    // The value is untouched.
    assert_eq!(text(&client.run(&[b"GET", b"s"]).await), "v");

    client.run(&[b"LPUSH", b"l", b"x"]).await;
    let reply = client.run(&[b"GET", b"l"]).await;
    assert!(error(&reply).starts_with("WRONGTYPE"));
}

#[tokio::test]
async fn bit_operations() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    assert_eq!(int(&client.run(&[b"SETBIT", b"b", b"7", b"1"]).await), 0);
    assert_eq!(int(&client.run(&[b"SETBIT", b"b", b"7", b"1"]).await), 1);
    assert_eq!(int(&client.run(&[b"GETBIT", b"b", b"7"]).await), 1);
    assert_eq!(int(&client.run(&[b"GETBIT", b"b", b"6"]).await), 0);
    assert_eq!(int(&client.run(&[b"BITCOUNT", b"b"]).await), 1);

    client.run(&[b"SET", b"x", b"abc"]).await;
    client.run(&[b"SET", b"y", b"ab"]).await;
    assert_eq!(int(&client.run(&[b"BITOP", b"AND", b"dst", b"x", b"y"]).await), 3);
    assert_eq!(int(&client.run(&[b"BITOP", b"XOR", b"dst", b"x", b"x"]).await), 3);
    assert_eq!(int(&client.run(&[b"BITCOUNT", b"dst"]).await), 0);

    assert_eq!(int(&client.run(&[b"BITOP", b"NOT", b"dst", b"x"]).await), 3);
    let reply = client.run(&[b"BITOP", b"NOT", b"dst", b"x", b"y"]).await;
    assert_eq!(
        error(&reply),
        "ERR BITOP NOT must be called with a single source key."
    );
}

#[tokio::test]
async fn bitcount_ranges() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    client.run(&[b"SET", b"k", b"foobar"]).await;
    assert_eq!(int(&client.run(&[b"BITCOUNT", b"k"]).await), 26);
    assert_eq!(int(&client.run(&[b"BITCOUNT", b"k", b"0", b"0"]).await), 4);
    assert_eq!(int(&client.run(&[b"BITCOUNT", b"k", b"1", b"1"]).await), 6);
    assert_eq!(int(&client.run(&[b"BITCOUNT", b"k", b"-2", b"-1"]).await), 7);
    assert_eq!(
        int(&client.run(&[b"BITCOUNT", b"k", b"5", b"30", b"BIT"]).await),
        17
    );
}

#[tokio::test]
async fn bitpos() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    client.run(&[b"SETBIT", b"bp", b"1", b"1"]).await;
    client.run(&[b"SETBIT", b"bp", b"15", b"1"]).await;

    assert_eq!(int(&client.run(&[b"BITPOS", b"bp", b"1"]).await), 1);
    assert_eq!(int(&client.run(&[b"BITPOS", b"bp", b"0"]).await), 0);
    assert_eq!(
        int(&client.run(&[b"BITPOS", b"bp", b"1", b"1", b"1", b"BYTE"]).await),
        15
    );
    assert_eq!(
        int(&client.run(&[b"BITPOS", b"bp", b"1", b"8", b"15", b"BIT"]).await),
        15
    );

    assert_eq!(int(&client.run(&[b"BITPOS", b"missing", b"1"]).await), -1);
    assert_eq!(int(&client.run(&[b"BITPOS", b"missing", b"0"]).await), 0);
}

#[tokio::test]
async fn bitfield_saturate() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    let reply = client
        .run(&[
            b"BITFIELD", b"bf", b"SET", b"u8", b"0", b"200", b"GET", b"u8", b"0", b"INCRBY",
            b"u8", b"0", b"60",
        ])
        .await;
    let values = array(&reply);
    assert_eq!(int(&values[0]), 0);
    assert_eq!(int(&values[1]), 200);
    assert_eq!(int(&values[2]), 4);

    let reply = client
        .run(&[b"BITFIELD", b"bf", b"SET", b"i8", b"0", b"120"])
        .await;
    assert_eq!(int(&array(&reply)[0]), 4);

    let reply = client
        .run(&[b"BITFIELD", b"bf", b"OVERFLOW", b"SAT", b"INCRBY", b"i8", b"0", b"20"])
        .await;
    assert_eq!(int(&array(&reply)[0]), 127);

    let reply = client
        .run(&[
            b"BITFIELD", b"bf", b"OVERFLOW", b"FAIL", b"INCRBY", b"i8", b"0", b"1", b"GET",
            b"i8", b"0",
        ])
        .await;
    let values = array(&reply);
    assert!(is_nil(&values[0]), "{values:?}");
    assert_eq!(int(&values[1]), 127);
}

#[tokio::test]
async fn hashes() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    assert_eq!(
        int(&client.run(&[b"HSET", b"h", b"a", b"1", b"b", b"2"]).await),
        2
    );
    assert_eq!(int(&client.run(&[b"HSET", b"h", b"a", b"9"]).await), 0);
    assert_eq!(text(&client.run(&[b"HGET", b"h", b"a"]).await), "9");
    assert!(is_nil(&client.run(&[b"HGET", b"h", b"missing"]).await));

    let reply = client.run(&[b"HGETALL", b"h"]).await;
    let values = array(&reply);
    assert_eq!(values.len(), 4);
    assert_eq!(text(&values[0]), "a");
    assert_eq!(text(&values[1]), "9");

    assert_eq!(int(&client.run(&[b"HDEL", b"h", b"a", b"b"]).await), 2);
    assert_eq!(int(&client.run(&[b"EXISTS", b"h"]).await), 0);
}

#[tokio::test]
async fn lists() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    assert_eq!(int(&client.run(&[b"RPUSH", b"l", b"b", b"c"]).await), 2);
    assert_eq!(int(&client.run(&[b"LPUSH", b"l", b"a"]).await), 3);
    assert_eq!(int(&client.run(&[b"LLEN", b"l"]).await), 3);

    let reply = client.run(&[b"LRANGE", b"l", b"0", b"-1"]).await;
    let values = array(&reply);
    assert_eq!(text(&values[0]), "a");
    assert_eq!(text(&values[1]), "b");
    assert_eq!(text(&values[2]), "c");

    let reply = client.run(&[b"LRANGE", b"l", b"5", b"9"]).await;
    assert!(array(&reply).is_empty());

    assert_eq!(text(&client.run(&[b"LINDEX", b"l", b"-1"]).await), "c");
    assert_eq!(text(&client.run(&[b"LSET", b"l", b"1", b"x"]).await), "OK");
    assert_eq!(text(&client.run(&[b"LINDEX", b"l", b"1"]).await), "x");

    let reply = client.run(&[b"LSET", b"l", b"99", b"x"]).await;
    assert_eq!(error(&reply), "ERR index out of range");

    assert_eq!(text(&client.run(&[b"LTRIM", b"l", b"1", b"1"]).await), "OK");
    assert_eq!(int(&client.run(&[b"LLEN", b"l"]).await), 1);

    assert_eq!(text(&client.run(&[b"LPOP", b"l"]).await), "x");
    assert!(is_nil(&client.run(&[b"RPOP", b"l"]).await));
    assert_eq!(int(&client.run(&[b"EXISTS", b"l"]).await), 0);
}

#[tokio::test]
async fn sets() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    assert_eq!(int(&client.run(&[b"SADD", b"s", b"a", b"b", b"a"]).await), 2);
    assert_eq!(int(&client.run(&[b"SCARD", b"s"]).await), 2);

    let reply = client.run(&[b"SMEMBERS", b"s"]).await;
    let mut members: Vec<String> = array(&reply).iter().map(text).collect();
    members.sort();
    assert_eq!(members, vec!["a".to_string(), "b".to_string()]);

    assert_eq!(int(&client.run(&[b"SREM", b"s", b"a", b"b"]).await), 2);
    assert_eq!(int(&client.run(&[b"EXISTS", b"s"]).await), 0);
}

#[tokio::test]
async fn sorted_sets() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    assert_eq!(
        int(&client
            .run(&[b"ZADD", b"z", b"2.5", b"b", b"1", b"a", b"5", b"c"])
            .await),
        3
    );

    // Ascending (score, member) order, scores rendered without noise.
    let reply = client.run(&[b"ZRANGE", b"z", b"0", b"-1", b"WITHSCORES"]).await;
    let values = array(&reply);
    assert_eq!(values.len(), 6);
    assert_eq!(text(&values[0]), "a");
    assert_eq!(text(&values[1]), "1");
    assert_eq!(text(&values[2]), "b");
    assert_eq!(text(&values[3]), "2.5");
    assert_eq!(text(&values[4]), "c");
    assert_eq!(text(&values[5]), "5");

    assert_eq!(text(&client.run(&[b"ZSCORE", b"z", b"b"]).await), "2.5");
    assert_eq!(int(&client.run(&[b"ZCARD", b"z"]).await), 3);
    assert_eq!(int(&client.run(&[b"ZRANK", b"z", b"c"]).await), 2);
    assert_eq!(int(&client.run(&[b"ZREVRANK", b"z", b"c"]).await), 0);
    assert!(is_nil(&client.run(&[b"ZRANK", b"z", b"missing"]).await));

    assert_eq!(
        int(&client.run(&[b"ZCOUNT", b"z", b"1", b"2.5"]).await),
        2
    );
    assert_eq!(
        int(&client.run(&[b"ZCOUNT", b"z", b"(1", b"+inf"]).await),
        2
    );

    let reply = client
        .run(&[b"ZRANGEBYSCORE", b"z", b"2", b"+inf", b"WITHSCORES"])
        .await;
    let values = array(&reply);
    assert_eq!(values.len(), 4);
    assert_eq!(text(&values[0]), "b");

    assert_eq!(text(&client.run(&[b"ZINCRBY", b"z", b"0.5", b"b"]).await), "3");

    assert_eq!(int(&client.run(&[b"ZREM", b"z", b"a"]).await), 1);
    assert_eq!(
        int(&client.run(&[b"ZREMRANGEBYSCORE", b"z", b"-inf", b"+inf"]).await),
        2
    );
    assert_eq!(int(&client.run(&[b"EXISTS", b"z"]).await), 0);
}

#[tokio::test]
async fn stream_lifecycle() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    let id1 = text(&client.run(&[b"XADD", b"s", b"*", b"a", b"1"]).await);
    let id2 = text(&client.run(&[b"XADD", b"s", b"*", b"b", b"2"]).await);
    assert!(id1 < id2, "{id1} {id2}");
    assert_eq!(int(&client.run(&[b"XLEN", b"s"]).await), 2);

    let reply = client.run(&[b"XRANGE", b"s", b"-", b"+"]).await;
    let entries = array(&reply);
    assert_eq!(entries.len(), 2);
    let first = array(&entries[0]);
    assert_eq!(text(&first[0]), id1);
    let fields = array(&first[1]);
    assert_eq!(text(&fields[0]), "a");
    assert_eq!(text(&fields[1]), "1");

    let reply = client.run(&[b"XREVRANGE", b"s", b"+", b"-"]).await;
    assert_eq!(text(&array(&array(&reply)[0])[0]), id2);

    assert_eq!(int(&client.run(&[b"XTRIM", b"s", b"MAXLEN", b"1"]).await), 1);
    assert_eq!(int(&client.run(&[b"XLEN", b"s"]).await), 1);
}

#[tokio::test]
async fn stream_explicit_ids() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    assert_eq!(text(&client.run(&[b"XADD", b"s", b"5-1", b"a", b"1"]).await), "5-1");
    assert_eq!(text(&client.run(&[b"XADD", b"s", b"5-2", b"a", b"2"]).await), "5-2");

    let reply = client.run(&[b"XADD", b"s", b"5-2", b"a", b"3"]).await;
    assert_eq!(
        error(&reply),
        "ERR The ID specified in XADD is equal or smaller than the target stream top item"
    );

    // XSETID moves the cursor forward; new auto ids land after it.
    assert_eq!(text(&client.run(&[b"XSETID", b"s", b"100-0"]).await), "OK");
    let reply = client.run(&[b"XADD", b"s", b"100-0", b"a", b"4"]).await;
    assert!(error(&reply).starts_with("ERR The ID"));
    assert_eq!(text(&client.run(&[b"XADD", b"s", b"100-1", b"a", b"4"]).await), "100-1");

    assert_eq!(int(&client.run(&[b"XDEL", b"s", b"5-1", b"9-9"]).await), 1);
    assert_eq!(int(&client.run(&[b"XLEN", b"s"]).await), 2);

    assert_eq!(int(&client.run(&[b"XTRIM", b"s", b"MINID", b"100"]).await), 1);
    assert_eq!(int(&client.run(&[b"XLEN", b"s"]).await), 1);
}

#[tokio::test]
async fn xread_returns_newer_entries() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    client.run(&[b"XADD", b"s", b"1-1", b"a", b"1"]).await;
    client.run(&[b"XADD", b"s", b"2-1", b"b", b"2"]).await;

    let reply = client.run(&[b"XREAD", b"STREAMS", b"s", b"1-1"]).await;
    let streams = array(&reply);
    assert_eq!(streams.len(), 1);
    let stream = array(&streams[0]);
    assert_eq!(text(&stream[0]), "s");
    let entries = array(&stream[1]);
    assert_eq!(entries.len(), 1);
    assert_eq!(text(&array(&entries[0])[0]), "2-1");

    // Nothing newer than the tail.
    let reply = client.run(&[b"XREAD", b"STREAMS", b"s", b"2-1"]).await;
    assert!(is_nil(&reply), "{reply:?}");
}

#[tokio::test]
async fn xread_blocks_until_xadd() {
    let server = Server::default();
    let mut reader = TestClient::connect(&server);
    let mut writer = TestClient::connect(&server);

    reader
        .send(&[b"XREAD", b"BLOCK", b"0", b"STREAMS", b"s", b"$"])
        .await;

    // Give the read a moment to park.
    sleep(Duration::from_millis(50)).await;
    writer.run(&[b"XADD", b"s", b"7-1", b"a", b"1"]).await;

    let reply = reader.read().await;
    let streams = array(&reply);
    let stream = array(&streams[0]);
    assert_eq!(text(&stream[0]), "s");
    assert_eq!(text(&array(&array(&stream[1])[0])[0]), "7-1");
}

#[tokio::test]
async fn xread_block_times_out() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    let reply = client
        .run(&[b"XREAD", b"BLOCK", b"50", b"STREAMS", b"s", b"$"])
        .await;
    assert!(is_nil(&reply), "{reply:?}");
}

#[tokio::test]
async fn consumer_group_lifecycle() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    let reply = client.run(&[b"XGROUP", b"CREATE", b"s", b"g", b"-"]).await;
    assert_eq!(error(&reply), "ERR The XGROUP subcommand requires the key to exist");

    assert_eq!(
        text(&client.run(&[b"XGROUP", b"CREATE", b"s", b"g", b"-", b"MKSTREAM"]).await),
        "OK"
    );
    let reply = client.run(&[b"XGROUP", b"CREATE", b"s", b"g", b"-"]).await;
    assert_eq!(error(&reply), "BUSYGROUP Consumer Group name already exists");

    let id = text(&client.run(&[b"XADD", b"s", b"*", b"a", b"1"]).await);

    let reply = client
        .run(&[b"XREADGROUP", b"GROUP", b"g", b"c", b"STREAMS", b"s", b">"])
        .await;
    let stream = array(&array(&reply)[0]);
    let entries = array(&stream[1]);
    assert_eq!(entries.len(), 1);
    assert_eq!(text(&array(&entries[0])[0]), id);

    // Summary: one pending entry, owned by c.
    let reply = client.run(&[b"XPENDING", b"s", b"g"]).await;
    let summary = array(&reply);
    assert_eq!(int(&summary[0]), 1);
    assert_eq!(text(&summary[1]), id);
    assert_eq!(text(&summary[2]), id);
    let consumers = array(&summary[3]);
    let consumer = array(&consumers[0]);
    assert_eq!(text(&consumer[0]), "c");
    assert_eq!(text(&consumer[1]), "1");

    // Nothing new is delivered twice.
    let reply = client
        .run(&[b"XREADGROUP", b"GROUP", b"g", b"c", b"STREAMS", b"s", b">"])
        .await;
    assert!(is_nil(&reply), "{reply:?}");

    // Rereading own history returns the pending entry.
    let reply = client
        .run(&[b"XREADGROUP", b"GROUP", b"g", b"c", b"STREAMS", b"s", b"0"])
        .await;
    let stream = array(&array(&reply)[0]);
    assert_eq!(array(&stream[1]).len(), 1);

    assert_eq!(int(&client.run(&[b"XACK", b"s", b"g", id.as_bytes()]).await), 1);
    let reply = client.run(&[b"XPENDING", b"s", b"g"]).await;
    assert_eq!(int(&array(&reply)[0]), 0);

    assert_eq!(int(&client.run(&[b"XGROUP", b"DESTROY", b"s", b"g"]).await), 1);
}

#[tokio::test]
async fn xclaim_transfers_ownership() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    client
        .run(&[b"XGROUP", b"CREATE", b"s", b"g", b"-", b"MKSTREAM"])
        .await;
    let id = text(&client.run(&[b"XADD", b"s", b"1-1", b"a", b"1"]).await);
    client
        .run(&[b"XREADGROUP", b"GROUP", b"g", b"alice", b"STREAMS", b"s", b">"])
        .await;

    // Claim with zero idle so the test never races the clock.
    let reply = client
        .run(&[b"XCLAIM", b"s", b"g", b"bob", b"0", id.as_bytes()])
        .await;
    let entries = array(&reply);
    assert_eq!(entries.len(), 1);
    assert_eq!(text(&array(&entries[0])[0]), id);

    let reply = client
        .run(&[b"XPENDING", b"s", b"g", b"-", b"+", b"10"])
        .await;
    let rows = array(&reply);
    assert_eq!(rows.len(), 1);
    let row = array(&rows[0]);
    assert_eq!(text(&row[1]), "bob");
    assert_eq!(int(&row[3]), 2);

    // JUSTID returns bare ids and leaves the retry counter alone.
    let reply = client
        .run(&[b"XCLAIM", b"s", b"g", b"carol", b"0", id.as_bytes(), b"JUSTID"])
        .await;
    assert_eq!(text(&array(&reply)[0]), id);

    assert_eq!(
        int(&client.run(&[b"XGROUP", b"DELCONSUMER", b"s", b"g", b"carol"]).await),
        1
    );
}

#[tokio::test]
async fn xinfo_reports_shape() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    client
        .run(&[b"XGROUP", b"CREATE", b"s", b"g", b"$", b"MKSTREAM"])
        .await;
    client.run(&[b"XADD", b"s", b"3-1", b"a", b"1"]).await;

    let reply = client.run(&[b"XINFO", b"STREAM", b"s"]).await;
    let info = array(&reply);
    assert_eq!(text(&info[0]), "length");
    assert_eq!(int(&info[1]), 1);
    assert_eq!(text(&info[2]), "last-generated-id");
    assert_eq!(text(&info[3]), "3-1");

    let reply = client.run(&[b"XINFO", b"GROUPS", b"s"]).await;
    let group = array(&array(&reply)[0]);
    assert_eq!(text(&group[0]), "name");
    assert_eq!(text(&group[1]), "g");

    client
        .run(&[b"XREADGROUP", b"GROUP", b"g", b"c", b"STREAMS", b"s", b">"])
        .await;
    let reply = client.run(&[b"XINFO", b"CONSUMERS", b"s", b"g"]).await;
    let consumer = array(&array(&reply)[0]);
    assert_eq!(text(&consumer[1]), "c");
    assert_eq!(int(&consumer[3]), 1);
}

#[tokio::test]
async fn watch_abort() {
    let server = Server::default();
    let mut c1 = TestClient::connect(&server);
    let mut c2 = TestClient::connect(&server);

    c1.run(&[b"SET", b"mykey", b"10"]).await;
    assert_eq!(text(&c1.run(&[b"WATCH", b"mykey"]).await), "OK");

    c2.run(&[b"SET", b"mykey", b"20"]).await;

    assert_eq!(text(&c1.run(&[b"MULTI"]).await), "OK");
    assert_eq!(text(&c1.run(&[b"SET", b"mykey", b"30"]).await), "QUEUED");
    let reply = c1.run(&[b"EXEC"]).await;
    assert!(is_nil(&reply), "{reply:?}");

    assert_eq!(text(&c1.run(&[b"GET", b"mykey"]).await), "20");
}

#[tokio::test]
async fn exec_applies_queued_commands() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    assert_eq!(text(&client.run(&[b"MULTI"]).await), "OK");
    assert_eq!(text(&client.run(&[b"SET", b"k", b"1"]).await), "QUEUED");
    assert_eq!(text(&client.run(&[b"INCR", b"k"]).await), "QUEUED");

    let reply = client.run(&[b"EXEC"]).await;
    let replies = array(&reply);
    assert_eq!(replies.len(), 2);
    assert_eq!(text(&replies[0]), "OK");
    assert_eq!(int(&replies[1]), 2);

    assert_eq!(text(&client.run(&[b"GET", b"k"]).await), "2");
}

#[tokio::test]
async fn transaction_misuse_errors() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    assert_eq!(error(&client.run(&[b"EXEC"]).await), "ERR EXEC without MULTI");
    assert_eq!(
        error(&client.run(&[b"DISCARD"]).await),
        "ERR DISCARD without MULTI"
    );

    client.run(&[b"MULTI"]).await;
    assert_eq!(
        error(&client.run(&[b"MULTI"]).await),
        "ERR MULTI calls can not be nested"
    );
    assert_eq!(
        error(&client.run(&[b"WATCH", b"k"]).await),
        "ERR WATCH inside MULTI is not allowed"
    );

    // An arity error rejects just that command; the queue stays valid.
    assert!(error(&client.run(&[b"GET"]).await).starts_with("ERR wrong number"));
    assert_eq!(text(&client.run(&[b"SET", b"k", b"v"]).await), "QUEUED");

    let reply = client.run(&[b"EXEC"]).await;
    assert_eq!(array(&reply).len(), 1);
    assert_eq!(text(&client.run(&[b"GET", b"k"]).await), "v");
}

#[tokio::test]
async fn exec_surfaces_runtime_errors() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    client.run(&[b"SET", b"s", b"text"]).await;
    client.run(&[b"MULTI"]).await;
    client.run(&[b"INCR", b"s"]).await;
    client.run(&[b"SET", b"other", b"1"]).await;

    let reply = client.run(&[b"EXEC"]).await;
    let replies = array(&reply);
    assert_eq!(replies.len(), 2);
    assert!(error(&replies[0]).starts_with("ERR value is not an integer"));
    assert_eq!(text(&replies[1]), "OK");
}

#[tokio::test]
async fn discard_drops_the_queue() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    client.run(&[b"MULTI"]).await;
    client.run(&[b"SET", b"k", b"v"]).await;
    assert_eq!(text(&client.run(&[b"DISCARD"]).await), "OK");
    assert_eq!(int(&client.run(&[b"EXISTS", b"k"]).await), 0);
}

#[tokio::test]
async fn unwatch_clears_the_watch_set() {
    let server = Server::default();
    let mut c1 = TestClient::connect(&server);
    let mut c2 = TestClient::connect(&server);

    c1.run(&[b"WATCH", b"k"]).await;
    assert_eq!(text(&c1.run(&[b"UNWATCH"]).await), "OK");

    c2.run(&[b"SET", b"k", b"20"]).await;

    c1.run(&[b"MULTI"]).await;
    c1.run(&[b"SET", b"k", b"30"]).await;
    let reply = c1.run(&[b"EXEC"]).await;
    assert_eq!(array(&reply).len(), 1);
    assert_eq!(text(&c1.run(&[b"GET", b"k"]).await), "30");
}

#[tokio::test]
async fn publish_counts_deliveries() {
    let server = Server::default();
    let mut subscriber = TestClient::connect(&server);
    let mut publisher = TestClient::connect(&server);

    let reply = subscriber.run(&[b"SUBSCRIBE", b"news"]).await;
    let frames = array(&reply);
    assert_eq!(text(&frames[0]), "subscribe");
    assert_eq!(text(&frames[1]), "news");
    assert_eq!(int(&frames[2]), 1);

    assert_eq!(int(&publisher.run(&[b"PUBLISH", b"news", b"hi"]).await), 1);

    let message = subscriber.read().await;
    let frames = array(&message);
    assert_eq!(text(&frames[0]), "message");
    assert_eq!(text(&frames[1]), "news");
    assert_eq!(text(&frames[2]), "hi");

    assert_eq!(int(&publisher.run(&[b"PUBLISH", b"nobody", b"hi"]).await), 0);
}

#[tokio::test]
async fn pattern_subscriptions() {
    let server = Server::default();
    let mut subscriber = TestClient::connect(&server);
    let mut publisher = TestClient::connect(&server);

    let reply = subscriber.run(&[b"PSUBSCRIBE", b"news.*"]).await;
    assert_eq!(text(&array(&reply)[0]), "psubscribe");

    assert_eq!(
        int(&publisher.run(&[b"PUBLISH", b"news.sports", b"hi"]).await),
        1
    );

    let message = subscriber.read().await;
    let frames = array(&message);
    assert_eq!(text(&frames[0]), "pmessage");
    assert_eq!(text(&frames[1]), "news.*");
    assert_eq!(text(&frames[2]), "news.sports");
    assert_eq!(text(&frames[3]), "hi");
}

#[tokio::test]
async fn channel_and_pattern_both_count() {
    let server = Server::default();
    let mut subscriber = TestClient::connect(&server);
    let mut publisher = TestClient::connect(&server);

    subscriber.run(&[b"SUBSCRIBE", b"news.sports"]).await;
    subscriber.run(&[b"PSUBSCRIBE", b"news.*"]).await;

    // The same connection is delivered twice and counted twice.
    assert_eq!(
        int(&publisher.run(&[b"PUBLISH", b"news.sports", b"hi"]).await),
        2
    );
}

#[tokio::test]
async fn subscribed_mode_restricts_commands() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    client.run(&[b"SUBSCRIBE", b"ch"]).await;

    let reply = client.run(&[b"GET", b"k"]).await;
    assert_eq!(
        error(&reply),
        "ERR Can't execute 'get': only (P)SUBSCRIBE / (P)UNSUBSCRIBE / PING / QUIT are allowed in this context"
    );

    assert_eq!(text(&client.run(&[b"PING"]).await), "PONG");

    // Unsubscribing the last channel leaves subscribed mode.
    let reply = client.run(&[b"UNSUBSCRIBE", b"ch"]).await;
    assert_eq!(int(&array(&reply)[2]), 0);
    client.run(&[b"SET", b"k", b"v"]).await;
    assert_eq!(text(&client.run(&[b"GET", b"k"]).await), "v");
}

#[tokio::test]
async fn hyperloglog_counts() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    assert_eq!(int(&client.run(&[b"PFADD", b"h", b"a", b"b", b"c"]).await), 1);
    assert_eq!(int(&client.run(&[b"PFADD", b"h", b"a"]).await), 0);
    assert_eq!(int(&client.run(&[b"PFCOUNT", b"h"]).await), 3);

    client.run(&[b"PFADD", b"h2", b"c", b"d"]).await;
    assert_eq!(int(&client.run(&[b"PFCOUNT", b"h", b"h2"]).await), 4);

    assert_eq!(text(&client.run(&[b"PFMERGE", b"dst", b"h", b"h2"]).await), "OK");
    assert_eq!(int(&client.run(&[b"PFCOUNT", b"dst"]).await), 4);

    // A plain string is not a sketch.
    client.run(&[b"SET", b"plain", b"text"]).await;
    let reply = client.run(&[b"PFADD", b"plain", b"x"]).await;
    assert_eq!(
        error(&reply),
        "WRONGTYPE Key is not a valid HyperLogLog string value."
    );
}

#[tokio::test]
async fn hyperloglog_writes_keep_expiry() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    client.run(&[b"PFADD", b"h", b"a"]).await;
    assert_eq!(int(&client.run(&[b"EXPIRE", b"h", b"100"]).await), 1);

    // Adding to an existing sketch is an in-place write, not an overwrite.
    assert_eq!(int(&client.run(&[b"PFADD", b"h", b"b"]).await), 1);
    let ttl = int(&client.run(&[b"TTL", b"h"]).await);
    assert!((1..=100).contains(&ttl), "{ttl}");

    client.run(&[b"PFADD", b"src", b"c"]).await;
    assert_eq!(text(&client.run(&[b"PFMERGE", b"h", b"src"]).await), "OK");
    let ttl = int(&client.run(&[b"TTL", b"h"]).await);
    assert!((1..=100).contains(&ttl), "{ttl}");
    assert_eq!(int(&client.run(&[b"PFCOUNT", b"h"]).await), 3);
}

#[tokio::test]
async fn bloom_filter() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    assert_eq!(
        text(&client.run(&[b"BF.RESERVE", b"bf", b"0.01", b"100"]).await),
        "OK"
    );
    assert!(error(&client.run(&[b"BF.RESERVE", b"bf", b"0.01", b"100"]).await)
        .starts_with("ERR item exists"));

    assert_eq!(int(&client.run(&[b"BF.ADD", b"bf", b"a"]).await), 1);
    assert_eq!(int(&client.run(&[b"BF.ADD", b"bf", b"a"]).await), 0);
    assert_eq!(int(&client.run(&[b"BF.EXISTS", b"bf", b"a"]).await), 1);
    assert_eq!(int(&client.run(&[b"BF.EXISTS", b"bf", b"b"]).await), 0);

    let reply = client.run(&[b"BF.MADD", b"bf", b"x", b"y"]).await;
    assert_eq!(array(&reply).len(), 2);
    let reply = client.run(&[b"BF.MEXISTS", b"bf", b"x", b"nope"]).await;
    let values = array(&reply);
    assert_eq!(int(&values[0]), 1);
    assert_eq!(int(&values[1]), 0);

    let reply = client.run(&[b"BF.INFO", b"bf"]).await;
    assert_eq!(text(&array(&reply)[0]), "Capacity");
}

#[tokio::test]
async fn cuckoo_filter() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    assert_eq!(text(&client.run(&[b"CF.RESERVE", b"cf", b"128"]).await), "OK");
    assert_eq!(int(&client.run(&[b"CF.ADD", b"cf", b"a"]).await), 1);
    assert_eq!(int(&client.run(&[b"CF.ADD", b"cf", b"a"]).await), 1);
    assert_eq!(int(&client.run(&[b"CF.COUNT", b"cf", b"a"]).await), 2);

    assert_eq!(int(&client.run(&[b"CF.ADDNX", b"cf", b"a"]).await), 0);
    assert_eq!(int(&client.run(&[b"CF.ADDNX", b"cf", b"b"]).await), 1);

    assert_eq!(int(&client.run(&[b"CF.DEL", b"cf", b"a"]).await), 1);
    assert_eq!(int(&client.run(&[b"CF.COUNT", b"cf", b"a"]).await), 1);
    assert_eq!(int(&client.run(&[b"CF.EXISTS", b"cf", b"missing"]).await), 0);

    let reply = client
        .run(&[b"CF.INSERT", b"cf2", b"CAPACITY", b"64", b"ITEMS", b"p", b"q"])
        .await;
    assert_eq!(array(&reply).len(), 2);
    assert_eq!(int(&client.run(&[b"CF.EXISTS", b"cf2", b"p"]).await), 1);

    let reply = client.run(&[b"CF.INFO", b"cf2"]).await;
    assert_eq!(text(&array(&reply)[0]), "Size");
}

#[tokio::test]
async fn tdigest_quantiles() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    assert_eq!(text(&client.run(&[b"TDIGEST.CREATE", b"td"]).await), "OK");
    assert_eq!(
        text(&client.run(&[b"TDIGEST.ADD", b"td", b"1", b"2", b"3", b"4", b"5"]).await),
        "OK"
    );

    let reply = client
        .run(&[b"TDIGEST.QUANTILE", b"td", b"0", b"0.5", b"1"])
        .await;
    let values = array(&reply);
    assert_eq!(text(&values[0]), "1");
    assert_eq!(text(&values[1]), "3");
    assert_eq!(text(&values[2]), "5");

    assert_eq!(text(&client.run(&[b"TDIGEST.MIN", b"td"]).await), "1");
    assert_eq!(text(&client.run(&[b"TDIGEST.MAX", b"td"]).await), "5");

    let reply = client.run(&[b"TDIGEST.RANK", b"td", b"0", b"5"]).await;
    let values = array(&reply);
    assert_eq!(int(&values[0]), -1);
    assert_eq!(int(&values[1]), 4);

    let reply = client.run(&[b"TDIGEST.BYRANK", b"td", b"0", b"4"]).await;
    let values = array(&reply);
    assert_eq!(text(&values[0]), "1");
    assert_eq!(text(&values[1]), "5");

    let reply = client
        .run(&[b"TDIGEST.TRIMMED_MEAN", b"td", b"0", b"1"])
        .await;
    assert_eq!(text(&reply), "3");

    assert_eq!(text(&client.run(&[b"TDIGEST.RESET", b"td"]).await), "OK");
    assert_eq!(text(&client.run(&[b"TDIGEST.MIN", b"td"]).await), "nan");

    assert_eq!(
        error(&client.run(&[b"TDIGEST.ADD", b"missing-key", b"1"]).await),
        "ERR key does not exist"
    );
}

#[tokio::test]
async fn topk_tracks_heavy_hitters() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    assert_eq!(
        text(&client.run(&[b"TOPK.RESERVE", b"tk", b"2", b"64", b"7", b"0.9"]).await),
        "OK"
    );

    for _ in 0..5 {
        client.run(&[b"TOPK.ADD", b"tk", b"heavy"]).await;
    }
    client.run(&[b"TOPK.INCRBY", b"tk", b"medium", b"3"]).await;
    client.run(&[b"TOPK.ADD", b"tk", b"light"]).await;

    let reply = client.run(&[b"TOPK.QUERY", b"tk", b"heavy", b"nothing"]).await;
    let values = array(&reply);
    assert_eq!(int(&values[0]), 1);
    assert_eq!(int(&values[1]), 0);

    let reply = client.run(&[b"TOPK.COUNT", b"tk", b"heavy"]).await;
    assert!(int(&array(&reply)[0]) >= 4);

    let reply = client.run(&[b"TOPK.LIST", b"tk", b"WITHCOUNT"]).await;
    let values = array(&reply);
    assert_eq!(text(&values[0]), "heavy");

    let reply = client.run(&[b"TOPK.INFO", b"tk"]).await;
    assert_eq!(text(&array(&reply)[0]), "k");
    assert_eq!(int(&array(&reply)[1]), 2);
}

#[tokio::test]
async fn timeseries_ranges() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    assert_eq!(text(&client.run(&[b"TS.CREATE", b"t"]).await), "OK");
    assert_eq!(
        error(&client.run(&[b"TS.CREATE", b"t"]).await),
        "ERR TSDB: key already exists"
    );

    assert_eq!(int(&client.run(&[b"TS.ADD", b"t", b"10", b"1.5"]).await), 10);
    assert_eq!(int(&client.run(&[b"TS.ADD", b"t", b"20", b"2.5"]).await), 20);
    assert_eq!(int(&client.run(&[b"TS.ADD", b"t", b"30", b"4"]).await), 30);

    let reply = client.run(&[b"TS.GET", b"t"]).await;
    let sample = array(&reply);
    assert_eq!(int(&sample[0]), 30);
    assert_eq!(text(&sample[1]), "4");

    let reply = client.run(&[b"TS.RANGE", b"t", b"15", b"+"]).await;
    let rows = array(&reply);
    assert_eq!(rows.len(), 2);
    assert_eq!(int(&array(&rows[0])[0]), 20);

    let reply = client
        .run(&[b"TS.RANGE", b"t", b"-", b"+", b"AGGREGATION", b"sum", b"20"])
        .await;
    let rows = array(&reply);
    // Buckets [0,20) and [20,40).
    assert_eq!(rows.len(), 2);
    assert_eq!(text(&array(&rows[0])[1]), "1.5");
    assert_eq!(text(&array(&rows[1])[1]), "6.5");

    let reply = client.run(&[b"TS.REVRANGE", b"t", b"-", b"+", b"COUNT", b"1"]).await;
    let rows = array(&reply);
    assert_eq!(rows.len(), 1);
    assert_eq!(int(&array(&rows[0])[0]), 30);

    assert_eq!(int(&client.run(&[b"TS.DEL", b"t", b"10", b"20"]).await), 2);

    let reply = client.run(&[b"TS.INFO", b"t"]).await;
    let info = array(&reply);
    assert_eq!(text(&info[0]), "totalSamples");
    assert_eq!(int(&info[1]), 1);

    assert_eq!(
        error(&client.run(&[b"TS.INFO", b"missing"]).await),
        "ERR key does not exist"
    );
}

#[tokio::test]
async fn timeseries_counters() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    assert_eq!(
        int(&client.run(&[b"TS.INCRBY", b"c", b"5", b"TIMESTAMP", b"100"]).await),
        100
    );
    assert_eq!(
        int(&client.run(&[b"TS.INCRBY", b"c", b"2", b"TIMESTAMP", b"200"]).await),
        200
    );
    assert_eq!(
        int(&client.run(&[b"TS.DECRBY", b"c", b"3", b"TIMESTAMP", b"300"]).await),
        300
    );

    let reply = client.run(&[b"TS.GET", b"c"]).await;
    assert_eq!(text(&array(&reply)[1]), "4");

    // Timestamps must not go backwards.
    let reply = client
        .run(&[b"TS.INCRBY", b"c", b"1", b"TIMESTAMP", b"100"])
        .await;
    assert_eq!(error(&reply), "ERR invalid arguments");
}

#[tokio::test]
async fn vector_similarity() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    assert_eq!(text(&client.run(&[b"VSET", b"a", b"1", b"2"]).await), "OK");
    assert_eq!(text(&client.run(&[b"VSET", b"b", b"3", b"4"]).await), "OK");

    assert_eq!(int(&client.run(&[b"VDIM", b"a"]).await), 2);

    let reply = client.run(&[b"VGET", b"a"]).await;
    let components = array(&reply);
    assert_eq!(text(&components[0]), "1");
    assert_eq!(text(&components[1]), "2");

    assert_eq!(text(&client.run(&[b"VSIM", b"a", b"b", b"DOT"]).await), "11");

    let l2 = text(&client.run(&[b"VSIM", b"a", b"b", b"L2"]).await);
    let l2: f64 = l2.parse().unwrap();
    assert!((l2 - 8.0f64.sqrt()).abs() < 1e-12);

    client.run(&[b"VSET", b"c", b"1"]).await;
    assert_eq!(
        error(&client.run(&[b"VSIM", b"a", b"c", b"COSINE"]).await),
        "ERR invalid vector operation"
    );
    assert_eq!(
        error(&client.run(&[b"VSIM", b"a", b"b", b"HAMMING"]).await),
        "ERR invalid vector operation"
    );

    assert_eq!(int(&client.run(&[b"VDEL", b"c"]).await), 1);
    assert_eq!(int(&client.run(&[b"VDEL", b"c"]).await), 0);
}

#[tokio::test]
async fn vector_search() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    client.run(&[b"VSET", b"emb:a", b"1", b"0"]).await;
    client.run(&[b"VSET", b"emb:b", b"0.9", b"0.1"]).await;
    client.run(&[b"VSET", b"emb:c", b"-1", b"0"]).await;
    client.run(&[b"VSET", b"other", b"1", b"0"]).await;

    let reply = client
        .run(&[b"VSEARCH", b"emb:", b"2", b"COSINE", b"1", b"0"])
        .await;
    let values = array(&reply);
    assert_eq!(values.len(), 4);
    assert_eq!(text(&values[0]), "emb:a");
    assert_eq!(text(&values[1]), "1");
    assert_eq!(text(&values[2]), "emb:b");
    assert!(text(&values[3]).starts_with("0.99"), "{:?}", text(&values[3]));

    let reply = client
        .run(&[b"VSEARCH", b"emb:", b"1", b"L2", b"1", b"0"])
        .await;
    let values = array(&reply);
    assert_eq!(text(&values[0]), "emb:a");
    assert_eq!(text(&values[1]), "0");

    // Keyword form pages through results.
    let reply = client
        .run(&[b"VSEARCH", b"emb:", b"COSINE", b"LIMIT", b"1", b"1", b"1", b"0"])
        .await;
    let values = array(&reply);
    assert_eq!(values.len(), 2);
    assert_eq!(text(&values[0]), "emb:b");

    let reply = client
        .run(&[b"VSEARCH", b"emb:", b"COSINE", b"1", b"0"])
        .await;
    assert_eq!(error(&reply), "ERR LIMIT is required");

    // Mixing the positional and keyword forms is rejected.
    let reply = client
        .run(&[b"VSEARCH", b"emb:", b"2", b"COSINE", b"LIMIT", b"0", b"2", b"1", b"0"])
        .await;
    assert_eq!(error(&reply), "ERR syntax error");
}

#[tokio::test]
async fn quit_closes_the_connection() {
    let server = Server::default();
    let mut client = TestClient::connect(&server);

    assert_eq!(text(&client.run(&[b"QUIT"]).await), "OK");
    let result = timeout(TIMEOUT, client.reader.value()).await.expect("timed out");
    assert!(matches!(result, Ok(None) | Err(_)), "{result:?}");
}
