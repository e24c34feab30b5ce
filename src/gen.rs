use itertools::Itertools;

use crate::error::{Result, ScanError};

/// 默认字符集: 小写字母在前, 数字在后
pub const DEFAULT_CHARSET: &str = "abcdefghijklmnopqrstuvwxyz0123456789";

/// DNS 单个标签的最大长度
pub const MAX_LABEL_LENGTH: usize = 63;

/// 定长子域名标签生成器
///
/// 按字符集顺序做笛卡尔积, 输出顺序是确定的字典序。
#[derive(Debug, Clone)]
pub struct LabelGenerator {
    alphabet: Vec<char>,
}

impl LabelGenerator {
    /// 使用自定义字符集, 重复字符只保留第一次出现的位置
    pub fn new(alphabet: &str) -> Self {
        LabelGenerator {
            alphabet: alphabet.chars().unique().collect(),
        }
    }

    /// 长度为 `length` 的标签总数, 溢出时取 `usize::MAX`
    pub fn candidate_count(&self, length: usize) -> usize {
        let exp = u32::try_from(length).unwrap_or(u32::MAX);
        self.alphabet.len().saturating_pow(exp)
    }

    /// 按顺序惰性生成所有长度为 `length` 的标签
    ///
    /// 调用方按需分块取用, 内存占用与已取出的数量有关, 与总数无关。
    pub fn generate(&self, length: usize) -> Result<impl Iterator<Item = String> + '_> {
        if self.alphabet.is_empty() {
            return Err(ScanError::EmptyAlphabet);
        }
        if length == 0 || length > MAX_LABEL_LENGTH {
            return Err(ScanError::InvalidLength(length));
        }

        let labels = std::iter::repeat(self.alphabet.iter().copied())
            .take(length)
            .multi_cartesian_product()
            .map(|chars| chars.into_iter().collect::<String>());
        Ok(labels)
    }
}

impl Default for LabelGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CHARSET)
    }
}

/// 拼接完整候选域名
pub fn build_fqc(label: &str, domain: &str) -> String {
    let mut fqc = String::with_capacity(label.len() + domain.len() + 1);
    fqc.push_str(label);
    fqc.push('.');
    fqc.push_str(domain);
    fqc
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn labels(length: usize) -> Vec<String> {
        LabelGenerator::default().generate(length).unwrap().collect()
    }

    #[test]
    fn single_char_labels() {
        let labels = labels(1);
        assert_eq!(labels.len(), 36);
        assert_eq!(labels[0], "a");
        assert_eq!(labels[25], "z");
        assert_eq!(labels[26], "0");
        assert_eq!(labels[35], "9");
    }

    #[test]
    fn labels_are_distinct_and_fixed_length() {
        let generator = LabelGenerator::default();
        for length in 1..=3 {
            let labels = labels(length);
            assert_eq!(labels.len(), 36usize.pow(length as u32));
            assert_eq!(labels.len(), generator.candidate_count(length));
            assert!(labels.iter().all(|l| l.chars().count() == length));

            let unique: HashSet<_> = labels.iter().collect();
            assert_eq!(unique.len(), labels.len());
        }
    }

    #[test]
    fn two_char_order_is_lexicographic_over_charset() {
        let labels = labels(2);
        assert_eq!(&labels[..3], &["aa", "ab", "ac"]);
        assert_eq!(labels[36], "ba");
        assert_eq!(labels.last().unwrap(), "99");
    }

    #[test]
    fn generation_is_reproducible() {
        assert_eq!(labels(2), labels(2));
    }

    #[test]
    fn long_labels_are_generated_lazily() {
        let generator = LabelGenerator::default();
        assert_eq!(generator.candidate_count(6), 2_176_782_336);

        // 只取前几个, 不会生成全部 36^6 个标签
        let first: Vec<String> = generator.generate(6).unwrap().take(3).collect();
        assert_eq!(first, vec!["aaaaaa", "aaaaab", "aaaaac"]);
    }

    #[test]
    fn candidate_count_saturates() {
        let generator = LabelGenerator::default();
        assert_eq!(generator.candidate_count(MAX_LABEL_LENGTH), usize::MAX);
    }

    #[test]
    fn rejects_zero_length() {
        let generator = LabelGenerator::default();
        assert!(matches!(generator.generate(0), Err(ScanError::InvalidLength(0))));
    }

    #[test]
    fn rejects_overlong_label() {
        let generator = LabelGenerator::default();
        assert!(generator.generate(MAX_LABEL_LENGTH).is_ok());
        assert!(matches!(
            generator.generate(MAX_LABEL_LENGTH + 1),
            Err(ScanError::InvalidLength(64))
        ));
    }

    #[test]
    fn rejects_empty_alphabet() {
        let generator = LabelGenerator::new("");
        assert!(matches!(generator.generate(1), Err(ScanError::EmptyAlphabet)));
        assert_eq!(generator.candidate_count(1), 0);
    }

    #[test]
    fn custom_alphabet_dedups() {
        let generator = LabelGenerator::new("abca");
        assert_eq!(generator.candidate_count(2), 9);
        assert_eq!(generator.generate(2).unwrap().count(), 9);
    }

    #[test]
    fn fqc_joins_with_dot() {
        assert_eq!(build_fqc("a", "example.com"), "a.example.com");
    }
}
