use crate::models::Asn;
use itertools::Itertools;
use std::fmt::{Display, Formatter};

/// Enum of AS path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AsPathSegment {
    AsSequence(Vec<Asn>),
    AsSet(Vec<Asn>),
    ConfedSequence(Vec<Asn>),
    ConfedSet(Vec<Asn>),
}

impl AsPathSegment {
    /// Shorthand for creating an `AsSequence` segment.
    pub fn sequence<S: AsRef<[u32]>>(seq: S) -> Self {
        AsPathSegment::AsSequence(seq.as_ref().iter().copied().map_into().collect())
    }

    /// Shorthand for creating an `AsSet` segment.
    pub fn set<S: AsRef<[u32]>>(seq: S) -> Self {
        AsPathSegment::AsSet(seq.as_ref().iter().copied().map_into().collect())
    }

    /// Get the number of ASNs this segment adds to the route.
    ///
    /// A set counts as one hop regardless of its members, and confederation
    /// segments are invisible to the route length.
    /// <https://datatracker.ietf.org/doc/html/rfc5065>
    pub fn route_len(&self) -> usize {
        match self {
            AsPathSegment::AsSequence(v) => v.len(),
            AsPathSegment::AsSet(_) => 1,
            AsPathSegment::ConfedSequence(_) | AsPathSegment::ConfedSet(_) => 0,
        }
    }
}

/// An AS path: an ordered list of segments as they appeared on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AsPath {
    pub segments: Vec<AsPathSegment>,
}

impl AsPath {
    pub fn from_segments(segments: Vec<AsPathSegment>) -> AsPath {
        AsPath { segments }
    }

    /// Shorthand for a path holding one `AsSequence` segment.
    pub fn from_sequence<S: AsRef<[u32]>>(seq: S) -> AsPath {
        AsPath {
            segments: vec![AsPathSegment::sequence(seq)],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of ASNs the path adds to the route.
    pub fn route_len(&self) -> usize {
        self.segments.iter().map(AsPathSegment::route_len).sum()
    }

    /// Construct the effective path from AS_PATH and AS4_PATH.
    ///
    /// <https://datatracker.ietf.org/doc/html/rfc6793#section-4.2.3>
    ///
    /// ```text
    ///    If the number of AS numbers in the AS_PATH attribute is less than the
    ///    number of AS numbers in the AS4_PATH attribute, then the AS4_PATH
    ///    attribute SHALL be ignored, and the AS_PATH attribute SHALL be taken
    ///    as the AS path information.
    ///
    ///    If the number of AS numbers in the AS_PATH attribute is larger than
    ///    or equal to the number of AS numbers in the AS4_PATH attribute, then
    ///    the AS path information SHALL be constructed by taking as many AS
    ///    numbers and path segments as necessary from the leading part of the
    ///    AS_PATH attribute, and then prepending them to the AS4_PATH attribute
    ///    so that the AS path information has a number of AS numbers identical
    ///    to that of the AS_PATH attribute.
    /// ```
    pub fn reconcile_as4(aspath: &AsPath, as4path: &AsPath) -> AsPath {
        if aspath.route_len() < as4path.route_len() {
            return aspath.clone();
        }

        let mut as4iter = as4path.segments.iter();
        let mut as4seg = as4iter.next();
        let mut new_segs: Vec<AsPathSegment> = Vec::with_capacity(aspath.segments.len());
        for seg in &aspath.segments {
            match (seg, as4seg) {
                (AsPathSegment::AsSequence(seq), Some(AsPathSegment::AsSequence(seq4))) => {
                    let keep = seq.len().saturating_sub(seq4.len());
                    let mut merged: Vec<Asn> = Vec::with_capacity(seq.len());
                    merged.extend(seq.iter().take(keep));
                    merged.extend(seq4.iter());
                    new_segs.push(AsPathSegment::AsSequence(merged));
                }
                (_, Some(seg4)) => new_segs.push(seg4.clone()),
                (seg, None) => new_segs.push(seg.clone()),
            }
            as4seg = as4iter.next();
        }

        AsPath { segments: new_segs }
    }

    /// The origin AS, when the path ends in a sequence.
    pub fn origin(&self) -> Option<Asn> {
        match self.segments.last() {
            Some(AsPathSegment::AsSequence(v)) => v.last().copied(),
            Some(AsPathSegment::AsSet(v)) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }
}

impl Display for AsPath {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        for (index, segment) in self.segments.iter().enumerate() {
            if index != 0 {
                write!(f, " ")?;
            }

            match segment {
                AsPathSegment::AsSequence(v) | AsPathSegment::ConfedSequence(v) => {
                    let mut asn_iter = v.iter();
                    if let Some(first_element) = asn_iter.next() {
                        write!(f, "{}", first_element)?;

                        for asn in asn_iter {
                            write!(f, " {}", asn)?;
                        }
                    }
                }
                AsPathSegment::AsSet(v) | AsPathSegment::ConfedSet(v) => {
                    write!(f, "{{")?;
                    let mut asn_iter = v.iter();
                    if let Some(first_element) = asn_iter.next() {
                        write!(f, "{}", first_element)?;

                        for asn in asn_iter {
                            write!(f, ",{}", asn)?;
                        }
                    }
                    write!(f, "}}")?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let path = AsPath::from_segments(vec![
            AsPathSegment::sequence([65001, 65002]),
            AsPathSegment::set([65003, 65004]),
        ]);
        assert_eq!("65001 65002 {65003,65004}", path.to_string());

        assert_eq!("", AsPath::default().to_string());
    }

    #[test]
    fn test_route_len() {
        let path = AsPath::from_segments(vec![
            AsPathSegment::sequence([1, 2, 3]),
            AsPathSegment::set([4, 5]),
            AsPathSegment::ConfedSequence(vec![Asn::from(6u32)]),
        ]);
        assert_eq!(4, path.route_len());
    }

    #[test]
    fn test_reconcile_as4() {
        // the two trailing AS_TRANS hops get their 4-octet values back
        let aspath = AsPath::from_sequence([65001, 23456, 23456]);
        let as4path = AsPath::from_sequence([70000, 70001]);
        let merged = AsPath::reconcile_as4(&aspath, &as4path);
        assert_eq!(merged, AsPath::from_sequence([65001, 70000, 70001]));

        // AS4_PATH longer than AS_PATH: ignored
        let aspath = AsPath::from_sequence([23456]);
        let as4path = AsPath::from_sequence([70000, 70001]);
        let merged = AsPath::reconcile_as4(&aspath, &as4path);
        assert_eq!(merged, aspath);

        // equal length: AS4_PATH wins outright
        let aspath = AsPath::from_sequence([23456, 23456]);
        let as4path = AsPath::from_sequence([70000, 70001]);
        let merged = AsPath::reconcile_as4(&aspath, &as4path);
        assert_eq!(merged, as4path);
    }

    #[test]
    fn test_origin() {
        let path = AsPath::from_sequence([65001, 65002]);
        assert_eq!(Some(Asn::from(65002u32)), path.origin());
        assert_eq!(None, AsPath::default().origin());
    }
}
