use criterion::{criterion_group, criterion_main, Criterion};
use sirf::*;

fn navigation_frame(i: i32) -> Vec<u8> {
    let mut p = vec![0u8; 41];
    p[0] = 0x02;
    p[1..5].copy_from_slice(&(-2_694_685 + i).to_be_bytes());
    p[5..9].copy_from_slice(&(-4_293_642 - i).to_be_bytes());
    p[9..13].copy_from_slice(&3_857_878i32.to_be_bytes());
    p[13..15].copy_from_slice(&(i as i16).to_be_bytes());
    p[28] = 4;
    p[29..33].copy_from_slice(&[3, 7, 19, 22]);
    frame_payload(&p).unwrap()
}

fn tracking_frame() -> Vec<u8> {
    let mut p = vec![0u8; 8 + 15 * CHANNELS];
    p[0] = 0x04;
    p[7] = CHANNELS as u8;
    for ch in 0..CHANNELS {
        let off = 8 + 15 * ch;
        p[off] = ch as u8 + 1;
        p[off + 4] = 0xbf;
        p[off + 5..off + 15].fill(38);
    }
    frame_payload(&p).unwrap()
}

fn stream() -> Vec<u8> {
    let mut data = Vec::new();
    for i in 0..500 {
        data.extend(navigation_frame(i));
        data.extend(tracking_frame());
        data.extend_from_slice(b"$GPGGA,1*4B\r\n");
    }
    data
}

fn parse_all(data: &[u8], chunk_size: usize) -> usize {
    let mut parser = Parser::default();
    let mut decoder = Decoder::<Ellipsoid>::default();
    let mut count = 0;
    for chunk in data.chunks(chunk_size) {
        let mut it = parser.consume(chunk);
        loop {
            match it.next() {
                Some(Ok(Packet::Sirf(frame))) => {
                    let decoded = decoder.decode(frame);
                    assert!(!decoded.truncated);
                    count += 1;
                },
                Some(Ok(_)) => {},
                Some(Err(e)) => {
                    panic!("No errors allowed! got: {:?}", e);
                },
                None => break,
            }
        }
    }
    count
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let data = stream();
    for chunk in &[1, 64, 256, 1024] {
        c.bench_function(&format!("parse_and_decode_{}", chunk), |b| {
            b.iter(|| assert_eq!(parse_all(&data, *chunk), 1000))
        });
    }
    let nav = navigation_frame(0);
    c.bench_function("decode_navigation", |b| {
        b.iter(|| decode(&nav, &SatelliteFixSummary::default()))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
