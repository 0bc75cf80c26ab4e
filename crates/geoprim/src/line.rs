use ahash::AHashMap;
use geo::{BooleanOps, Coord, LineString, MultiLineString, MultiPolygon};

use crate::precision::{dedup_line, reduce_precision};

/// Hashable key for an exact coordinate.
#[inline]
fn key(coord: &Coord<f64>) -> (u64, u64) {
    // Normalise -0.0 so that it meets +0.0.
    ((coord.x + 0.0).to_bits(), (coord.y + 0.0).to_bits())
}

/// Coordinates that terminate exactly one line part (degree 1), in the order
/// they are first met while walking the parts.
///
/// A simple open line yields its two ends. Closed rings contribute nothing and
/// branching or disjoint shapes may yield more than two; callers decide what
/// to do with anything other than a pair.
pub fn endpoints(lines: &MultiLineString<f64>) -> Vec<Coord<f64>> {
    let mut degree: AHashMap<(u64, u64), usize> = AHashMap::new();
    let mut order = Vec::new();

    for line in lines.0.iter().filter(|line| line.0.len() >= 2) {
        for end in [line.0[0], line.0[line.0.len() - 1]] {
            let count = degree.entry(key(&end)).or_insert(0);
            if *count == 0 { order.push(end) }
            *count += 1;
        }
    }

    order.into_iter()
        .filter(|coord| degree.get(&key(coord)) == Some(&1))
        .collect()
}

/// Stitch line parts that share end coordinates into longer lines.
///
/// Parts are joined greedily in input order, reversing a part when only its
/// far end matches. Parts with fewer than two vertices are dropped.
pub fn merge_lines(lines: &MultiLineString<f64>) -> MultiLineString<f64> {
    let mut remaining: Vec<Vec<Coord<f64>>> = lines.0.iter()
        .filter(|line| line.0.len() >= 2)
        .map(|line| line.0.clone())
        .collect();
    remaining.reverse(); // pop() from the back walks input order

    let mut merged = Vec::new();
    while let Some(mut chain) = remaining.pop() {
        loop {
            let head = chain[0];
            let tail = chain[chain.len() - 1];
            let Some(pos) = remaining.iter().position(|part| {
                let (start, end) = (part[0], part[part.len() - 1]);
                start == tail || end == tail || end == head || start == head
            }) else { break };

            let mut part = remaining.remove(pos);
            let (start, end) = (part[0], part[part.len() - 1]);
            if start == tail {
                chain.extend_from_slice(&part[1..]);
            } else if end == tail {
                part.reverse();
                chain.extend_from_slice(&part[1..]);
            } else if end == head {
                part.extend_from_slice(&chain[1..]);
                chain = part;
            } else {
                part.reverse();
                part.extend_from_slice(&chain[1..]);
                chain = part;
            }
        }
        merged.push(LineString(chain));
    }

    MultiLineString::new(merged)
}

/// Clip `line` to the interior of `window`.
///
/// The overlay engine may split a connected line into several parts at
/// vertices it introduces; when that happens the parts are snapped to
/// `decimals` decimal places and stitched back together so downstream
/// endpoint logic sees one connected line wherever the geometry allows it.
pub fn clip_line(window: &MultiPolygon<f64>, line: &MultiLineString<f64>, decimals: u32) -> MultiLineString<f64> {
    let clipped = window.clip(line, false);
    if clipped.0.len() <= 1 {
        return clipped;
    }

    let reduced = MultiLineString::new(
        reduce_precision(&clipped, decimals).0.iter()
            .map(dedup_line)
            .filter(|part| part.0.len() >= 2)
            .collect(),
    );
    merge_lines(&reduced)
}

/// The single line of a multi-part result, if it has exactly one part.
pub fn single_line(lines: &MultiLineString<f64>) -> Option<&LineString<f64>> {
    match lines.0.as_slice() {
        [line] => Some(line),
        _ => None,
    }
}
