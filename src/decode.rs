//! Greedy decoding of fingerspelling model output.
//!
//! Each step is an arg-max over one score vector. Sentinels are policy, not
//! errors: END terminates the sequence, PAD and START emit nothing. The step
//! confidence is the softmax probability of the arg-max and is computed before
//! the sentinel check, so skipped steps (and the END step itself) still count
//! toward the mean. Steps after END are never evaluated.

use crate::error::RecognitionError;
use crate::tables::{Token, Vocabulary};

/// Decoded text with its mean step confidence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Recognition {
    pub text: String,
    pub confidence: f32,
}

/// Arg-max index and its softmax probability for one step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodedStep {
    pub index: usize,
    pub confidence: f32,
}

/// Evaluate a single score vector. Ties resolve to the lowest index.
pub fn decode_step(scores: &[f32]) -> Result<DecodedStep, RecognitionError> {
    let (index, max) = scores
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, v)| match best {
            Some((_, m)) if m >= v => best,
            _ => Some((i, v)),
        })
        .ok_or_else(|| RecognitionError::input_shape("empty score vector in decode step"))?;

    // exp(max - max) == 1, so the arg-max probability is 1 / sum
    let sum: f32 = scores.iter().map(|v| (v - max).exp()).sum();
    Ok(DecodedStep {
        index,
        confidence: 1.0 / sum,
    })
}

/// Decode one output sequence (`[steps][vocab]`) into text.
pub fn decode_sequence(
    steps: &[Vec<f32>],
    vocab: &Vocabulary,
) -> Result<Recognition, RecognitionError> {
    let mut text = String::new();
    let mut confidences = Vec::with_capacity(steps.len());

    for scores in steps {
        let step = decode_step(scores)?;
        confidences.push(step.confidence);
        match vocab.token(step.index) {
            Some(Token::End) => break,
            Some(Token::Pad) | Some(Token::Start) => {}
            Some(Token::Char(c)) => text.push(c),
            None => log::debug!("decode: code {} has no vocabulary entry", step.index),
        }
    }

    Ok(Recognition {
        text,
        confidence: mean(&confidences),
    })
}

pub(crate) fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        // a=0 b=1 c=2, PAD=3 START=4 END=5
        Vocabulary::from_json_str(r#"{"a": 0, "b": 1, "c": 2}"#).unwrap()
    }

    fn one_hot(index: usize, peak: f32) -> Vec<f32> {
        let mut v = vec![0.0; 6];
        v[index] = peak;
        v
    }

    #[test]
    fn softmax_confidence_is_stable_for_large_logits() {
        let step = decode_step(&[100.0, 100.0 - 2.0_f32.ln()]).unwrap();
        assert_eq!(step.index, 0);
        assert!((step.confidence - 2.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn empty_input_decodes_to_nothing() {
        let r = decode_sequence(&[], &vocab()).unwrap();
        assert_eq!(r, Recognition { text: String::new(), confidence: 0.0 });
    }

    #[test]
    fn start_and_pad_are_skipped() {
        let steps = vec![one_hot(4, 5.0), one_hot(0, 5.0), one_hot(3, 5.0), one_hot(2, 5.0)];
        assert_eq!(decode_sequence(&steps, &vocab()).unwrap().text, "ac");
    }

    #[test]
    fn end_stops_decoding() {
        let steps = vec![
            one_hot(1, 4.0),
            one_hot(5, 4.0),
            one_hot(0, 4.0),
            vec![],
        ];
        // the empty step after END is never evaluated
        let r = decode_sequence(&steps, &vocab()).unwrap();
        assert_eq!(r.text, "b");
    }

    #[test]
    fn pad_then_end_yields_empty_text_with_mean_confidence() {
        let pad = vec![0.0, 0.0, 0.0, 2.0, 0.0, 0.0];
        let end = vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let after = one_hot(0, 50.0);
        let expected = (decode_step(&pad).unwrap().confidence
            + decode_step(&pad).unwrap().confidence
            + decode_step(&end).unwrap().confidence)
            / 3.0;

        let r = decode_sequence(&[pad.clone(), pad, end, after], &vocab()).unwrap();
        assert_eq!(r.text, "");
        assert!((r.confidence - expected).abs() < 1e-6);
    }

    #[test]
    fn sequence_without_end_decodes_every_step() {
        let steps = vec![one_hot(2, 3.0), one_hot(1, 3.0), one_hot(0, 3.0)];
        assert_eq!(decode_sequence(&steps, &vocab()).unwrap().text, "cba");
    }

    #[test]
    fn decoding_is_deterministic() {
        let steps = vec![vec![0.3, 0.1, 2.0, 0.0, -1.0, 0.5], one_hot(0, 1.0)];
        let a = decode_sequence(&steps, &vocab()).unwrap();
        let b = decode_sequence(&steps, &vocab()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_step_is_a_shape_error() {
        let err = decode_sequence(&[vec![]], &vocab()).unwrap_err();
        assert_eq!(err.kind(), "input_shape_error");
    }

    #[test]
    fn unknown_code_emits_nothing() {
        let mut wide = vec![0.0; 8];
        wide[7] = 9.0;
        let r = decode_sequence(&[wide, one_hot(0, 9.0)], &vocab()).unwrap();
        assert_eq!(r.text, "a");
    }
}
