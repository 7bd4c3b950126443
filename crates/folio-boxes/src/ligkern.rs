//! Ligatures and kerns.
//!
//! Characters are added to a horizontal list one at a time, without regard to their neighbours.
//! Before a list is broken into lines or packaged, this pass walks it once and
//! consults the font for every pair of adjacent characters in the same font:
//! the pair may combine into a ligature, or have a kern inserted between them.

use folio_core::{FontId, FontMetrics};

use crate::node::{Char, Discretionary, Horizontal, Kern, KernKind, Ligature};

/// Maximum number of times a single pair is re-examined after a ligature that
/// keeps the right character.
///
/// Badly formed ligature tables can cycle forever; after this many steps the pair is left alone.
const MAX_LIGATURE_STEPS: usize = 8;

/// A character being built up, possibly from several input characters.
struct Glyph {
    char: char,
    font: FontId,
    original: Vec<char>,
    source: Option<Char>,
}

impl Glyph {
    fn into_node(self, metrics: &dyn FontMetrics) -> Horizontal {
        if let Some(source) = self.source {
            if source.char == self.char && self.original.len() == 1 {
                return Horizontal::Char(source);
            }
        }
        Horizontal::Ligature(Ligature {
            char: self.char,
            font: self.font,
            width: metrics.width_of(self.font, self.char),
            height: metrics.height_of(self.font, self.char),
            depth: metrics.depth_of(self.font, self.char),
            original: self.original,
        })
    }
}

/// Applies the ligature and kern programs of the fonts to a horizontal list.
///
/// Discretionaries are processed recursively, each of their three lists on its own.
pub fn apply_ligatures_and_kerns(
    list: Vec<Horizontal>,
    metrics: &dyn FontMetrics,
) -> Vec<Horizontal> {
    let mut out = Vec::with_capacity(list.len());
    let mut current: Option<Glyph> = None;
    for node in list {
        let next = match node {
            Horizontal::Char(c) => Glyph {
                char: c.char,
                font: c.font,
                original: vec![c.char],
                source: Some(c),
            },
            Horizontal::Ligature(l) => Glyph {
                char: l.char,
                font: l.font,
                original: l.original,
                source: None,
            },
            other => {
                if let Some(glyph) = current.take() {
                    out.push(glyph.into_node(metrics));
                }
                out.push(match other {
                    Horizontal::Discretionary(disc) => {
                        Horizontal::Discretionary(Discretionary {
                            pre_break: apply_ligatures_and_kerns(disc.pre_break, metrics),
                            post_break: apply_ligatures_and_kerns(disc.post_break, metrics),
                            no_break: apply_ligatures_and_kerns(disc.no_break, metrics),
                        })
                    }
                    other => other,
                });
                continue;
            }
        };
        current = Some(match current.take() {
            None => next,
            Some(left) if left.font != next.font => {
                out.push(left.into_node(metrics));
                next
            }
            Some(left) => combine(left, next, metrics, &mut out),
        });
    }
    if let Some(glyph) = current {
        out.push(glyph.into_node(metrics));
    }
    out
}

/// Combines two adjacent glyphs in the same font.
///
/// Returns the glyph that should be combined with whatever comes next.
fn combine(
    mut left: Glyph,
    right: Glyph,
    metrics: &dyn FontMetrics,
    out: &mut Vec<Horizontal>,
) -> Glyph {
    for _ in 0..MAX_LIGATURE_STEPS {
        let Some(ligature) = metrics.ligature_for(left.font, left.char, right.char) else {
            break;
        };
        if ligature.consume_both {
            left.char = ligature.char;
            left.original.extend(right.original);
            left.source = None;
            return left;
        }
        left.char = ligature.char;
        left.source = None;
    }
    let kern = metrics.kern_between(left.font, left.char, right.char);
    out.push(left.into_node(metrics));
    if let Some(width) = kern {
        out.push(Horizontal::Kern(Kern {
            kind: KernKind::Normal,
            width,
        }));
    }
    right
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{CharMetrics, FixedMetrics, Scaled};

    fn c(char: char) -> Horizontal {
        Horizontal::Char(Char {
            char,
            font: FontId::NULL,
            width: Scaled::ONE * 5,
            height: Scaled::ONE * 7,
            depth: Scaled::ZERO,
        })
    }

    fn chars(list: &[Horizontal]) -> String {
        list.iter()
            .map(|node| match node {
                Horizontal::Char(c) => c.char.to_string(),
                Horizontal::Ligature(l) => format!("[{}]", l.char),
                Horizontal::Kern(k) => format!("<{}>", k.width),
                _ => "?".to_string(),
            })
            .collect()
    }

    fn metrics() -> FixedMetrics {
        FixedMetrics::default()
            .with_ligature(
                'f',
                'i',
                folio_core::Ligature {
                    char: 'ﬁ',
                    consume_both: true,
                },
            )
            .with_ligature(
                'f',
                'f',
                folio_core::Ligature {
                    char: 'ﬀ',
                    consume_both: true,
                },
            )
            .with_ligature(
                'ﬀ',
                'i',
                folio_core::Ligature {
                    char: 'ﬃ',
                    consume_both: true,
                },
            )
            .with_kern('A', 'V', -Scaled::ONE)
            .with_char(
                'ﬁ',
                CharMetrics {
                    width: Scaled::ONE * 8,
                    ..Default::default()
                },
            )
    }

    macro_rules! ligkern_tests {
        ( $( ($name: ident, $input: expr, $want: expr), )+ ) => {
            $(
                #[test]
                fn $name() {
                    let input: Vec<Horizontal> = $input.chars().map(c).collect();
                    let got = apply_ligatures_and_kerns(input, &metrics());
                    assert_eq!(chars(&got), $want);
                }
            )+
        };
    }

    ligkern_tests!(
        (no_change, "abc", "abc"),
        (single_ligature, "fin", "[ﬁ]n"),
        (chained_ligature, "ffi", "[ﬃ]"),
        (kern, "AVA", "A<-1.0pt>VA"),
        (empty, "", ""),
    );

    #[test]
    fn ligature_takes_metrics_of_new_char() {
        let got = apply_ligatures_and_kerns(vec![c('f'), c('i')], &metrics());
        match &got[0] {
            Horizontal::Ligature(l) => {
                assert_eq!(l.width, Scaled::ONE * 8);
                assert_eq!(l.original, vec!['f', 'i']);
            }
            other => panic!("expected ligature, got {other:?}"),
        }
    }

    #[test]
    fn different_fonts_do_not_combine() {
        let mut second = c('i');
        if let Horizontal::Char(ch) = &mut second {
            ch.font = FontId(1);
        }
        let got = apply_ligatures_and_kerns(vec![c('f'), second], &metrics());
        assert_eq!(chars(&got), "fi");
    }

    #[test]
    fn left_only_ligature_cycle_terminates() {
        let metrics = FixedMetrics::default()
            .with_ligature(
                'a',
                'b',
                folio_core::Ligature {
                    char: 'c',
                    consume_both: false,
                },
            )
            .with_ligature(
                'c',
                'b',
                folio_core::Ligature {
                    char: 'a',
                    consume_both: false,
                },
            );
        let got = apply_ligatures_and_kerns(vec![c('a'), c('b')], &metrics);
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn discretionary_lists_are_processed() {
        let list = vec![Horizontal::Discretionary(Discretionary {
            pre_break: vec![c('f'), c('i')],
            post_break: vec![],
            no_break: vec![c('A'), c('V')],
        })];
        let got = apply_ligatures_and_kerns(list, &metrics());
        match &got[0] {
            Horizontal::Discretionary(d) => {
                assert_eq!(chars(&d.pre_break), "[ﬁ]");
                assert_eq!(chars(&d.no_break), "A<-1.0pt>V");
            }
            other => panic!("expected discretionary, got {other:?}"),
        }
    }
}
