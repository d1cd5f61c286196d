use bytes::BytesMut;
use relay_protocol::line_codec::encode_line;
use relay_protocol::{LineBuffer, LineError};

fn drain(buf: &mut LineBuffer) -> Vec<String> {
    let mut out = Vec::new();
    while let Some(line) = buf.next_line().expect("no oversized lines") {
        out.push(String::from_utf8(line.to_vec()).unwrap());
    }
    out
}

#[test]
fn line_split_across_reads_is_reassembled() {
    let mut buf = LineBuffer::new(1024);

    buf.extend(br#"{"type":"robot_"#);
    assert!(drain(&mut buf).is_empty());
    assert_eq!(buf.pending(), 15);

    buf.extend(b"identify\",\"robot_id\":\"R1\"}\n");
    assert_eq!(
        drain(&mut buf),
        vec![r#"{"type":"robot_identify","robot_id":"R1"}"#.to_string()]
    );
    assert_eq!(buf.pending(), 0);
}

#[test]
fn several_lines_in_one_read_keep_order() {
    let mut buf = LineBuffer::new(1024);
    buf.extend(b"first\r\n\n   \nsecond\nthird-partial");

    assert_eq!(drain(&mut buf), vec!["first", "second"]);
    assert_eq!(buf.pending(), "third-partial".len());

    buf.extend(b"\n");
    assert_eq!(drain(&mut buf), vec!["third-partial"]);
}

#[test]
fn oversized_partial_line_is_reported_once_and_skipped() {
    let mut buf = LineBuffer::new(8);

    buf.extend(b"0123456789");
    assert_eq!(
        buf.next_line(),
        Err(LineError::TooLong { len: 10, max: 8 })
    );

    // Rest of the oversized line, then a normal one.
    buf.extend(b"abcdef\nok\n");
    assert_eq!(drain(&mut buf), vec!["ok"]);
}

#[test]
fn oversized_complete_line_is_rejected_without_losing_the_next() {
    let mut buf = LineBuffer::new(4);
    buf.extend(b"toolong\nfine\n");

    assert!(matches!(buf.next_line(), Err(LineError::TooLong { .. })));
    assert_eq!(drain(&mut buf), vec!["fine"]);
}

#[test]
fn encode_line_appends_newline() {
    let mut out = BytesMut::new();
    encode_line(r#"{"status":"success"}"#, &mut out);
    encode_line("{}", &mut out);
    assert_eq!(&out[..], b"{\"status\":\"success\"}\n{}\n");
}
