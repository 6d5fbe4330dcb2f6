//! Numbering taxonomy
//!
//! Classifies Word number formats (`w:numFmt`) into ordered and unordered
//! families and maps them onto a [`ListScheme`]. Also hosts the numeral
//! readers (roman, circled digits) shared by the analyzers.

use crate::document::cleanup::style_token;
use crate::document::models::ListScheme;
use crate::document::records::ListKind;

/// Number formats that produce an ordered sequence, in normalized form.
const ORDERED_NUMFMTS: &[&str] = &[
    "decimal",
    "decimalzero",
    "decimalleadingzero",
    "decimalfullwidth",
    "decimalhalfwidth",
    "decimalenclosedcircle",
    "decimalenclosedfullstop",
    "decimalenclosedparen",
    "decimalenclosedcirclechinese",
    "lowerroman",
    "upperroman",
    "lowerletter",
    "upperletter",
    "alpha",
    "alphabetic",
    "arabicalpha",
    "arabicabjad",
    "hebrew1",
    "hebrew2",
    "chinesecounting",
    "chinesecountingthousand",
    "chinesecountingtenthousand",
    "ideographtraditional",
    "ideographzodiac",
    "ideographdigital",
    "ideographenclosedcircle",
    "japanesecounting",
    "japanesedigitaltenthousand",
    "aiueo",
    "aiueofullwidth",
    "iroha",
    "irohafullwidth",
    "thainumbers",
    "thaicounting",
    "hindinumbers",
    "ganada",
    "ganadakr",
];

/// Number formats that never count.
const UNORDERED_NUMFMTS: &[&str] = &[
    "bullet", "none", "dingbat", "picture", "disc", "circle", "square",
];

/// Classify a raw `w:numFmt` value into `(ordered, scheme)`.
///
/// Unknown formats are treated as ordered decimal.
pub fn classify_num_format(num_format: &str) -> (bool, ListScheme) {
    let fmt = style_token(num_format.trim());

    if UNORDERED_NUMFMTS.contains(&fmt.as_str()) {
        return (false, ListScheme::Bullet);
    }
    if !ORDERED_NUMFMTS.contains(&fmt.as_str()) {
        return (true, ListScheme::Decimal);
    }

    let scheme = if fmt.contains("roman") {
        ListScheme::Roman
    } else if fmt.contains("arabic") {
        ListScheme::ArabicAlpha
    } else if fmt.contains("letter") || fmt.contains("alpha") {
        ListScheme::Alpha
    } else if fmt.contains("ganada") {
        ListScheme::Ganada
    } else if fmt.contains("hebrew") {
        ListScheme::Hebrew
    } else if fmt.contains("thai") {
        ListScheme::Thai
    } else if fmt.contains("chinese") || fmt.contains("ideograph") {
        ListScheme::Cjk
    } else if fmt.contains("aiueo") || fmt.contains("iroha") || fmt.contains("japanese") {
        ListScheme::Kana
    } else {
        ListScheme::Decimal
    };
    (true, scheme)
}

/// The list-type hint stamped on paragraphs whose numbering resolves.
pub fn list_kind_for_format(num_format: &str) -> ListKind {
    if classify_num_format(num_format).0 {
        ListKind::Number
    } else {
        ListKind::Bullet
    }
}

/// Value of a roman numeral, case-insensitive. Rejects non-canonical forms.
pub fn roman_value(text: &str) -> Option<u32> {
    if text.is_empty() {
        return None;
    }
    let upper = text.to_ascii_uppercase();
    let mut total = 0u32;
    let mut prev = 0u32;
    for c in upper.chars().rev() {
        let v = match c {
            'I' => 1,
            'V' => 5,
            'X' => 10,
            'L' => 50,
            'C' => 100,
            'D' => 500,
            'M' => 1000,
            _ => return None,
        };
        if v < prev {
            total = total.checked_sub(v)?;
        } else {
            total += v;
            prev = v;
        }
    }
    (to_roman(total) == upper).then_some(total)
}

fn to_roman(num: u32) -> String {
    let values = [1000, 900, 500, 400, 100, 90, 50, 40, 10, 9, 5, 4, 1];
    let symbols = [
        "M", "CM", "D", "CD", "C", "XC", "L", "XL", "X", "IX", "V", "IV", "I",
    ];

    let mut result = String::new();
    let mut n = num;

    for (i, &value) in values.iter().enumerate() {
        while n >= value {
            result.push_str(symbols[i]);
            n -= value;
        }
    }

    result
}

/// Numeric value of a circled or otherwise enclosed digit character.
pub fn circled_value(c: char) -> Option<u32> {
    let cp = c as u32;
    match cp {
        // ① .. ⑳
        0x2460..=0x2473 => Some(cp - 0x2460 + 1),
        // ㉑ .. ㉟
        0x3251..=0x325F => Some(cp - 0x3251 + 21),
        // ㊱ .. ㊿
        0x32B1..=0x32BF => Some(cp - 0x32B1 + 36),
        // dingbat negative and sans-serif circled digits, 1..10 each
        0x2776..=0x277F => Some(cp - 0x2776 + 1),
        0x2780..=0x2789 => Some(cp - 0x2780 + 1),
        0x278A..=0x2793 => Some(cp - 0x278A + 1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_num_format() {
        assert_eq!(classify_num_format("decimal"), (true, ListScheme::Decimal));
        assert_eq!(classify_num_format("lowerRoman"), (true, ListScheme::Roman));
        assert_eq!(classify_num_format("upperLetter"), (true, ListScheme::Alpha));
        assert_eq!(
            classify_num_format("arabicAlpha"),
            (true, ListScheme::ArabicAlpha)
        );
        assert_eq!(classify_num_format("ganada"), (true, ListScheme::Ganada));
        assert_eq!(
            classify_num_format("chineseCounting"),
            (true, ListScheme::Cjk)
        );
        assert_eq!(classify_num_format("iroha"), (true, ListScheme::Kana));
        assert_eq!(classify_num_format("bullet"), (false, ListScheme::Bullet));
        assert_eq!(classify_num_format("none"), (false, ListScheme::Bullet));
        assert_eq!(
            classify_num_format("somethingNew"),
            (true, ListScheme::Decimal)
        );
    }

    #[test]
    fn test_list_kind_for_format() {
        assert_eq!(list_kind_for_format("bullet"), ListKind::Bullet);
        assert_eq!(list_kind_for_format("decimal"), ListKind::Number);
    }

    #[test]
    fn test_roman_value() {
        assert_eq!(roman_value("iv"), Some(4));
        assert_eq!(roman_value("XIX"), Some(19));
        assert_eq!(roman_value("xx"), Some(20));
        assert_eq!(roman_value("IIII"), None);
        assert_eq!(roman_value("abc"), None);
        assert_eq!(roman_value(""), None);
    }

    #[test]
    fn test_circled_value() {
        assert_eq!(circled_value('①'), Some(1));
        assert_eq!(circled_value('⑳'), Some(20));
        assert_eq!(circled_value('㉑'), Some(21));
        assert_eq!(circled_value('㊿'), Some(50));
        assert_eq!(circled_value('❶'), Some(1));
        assert_eq!(circled_value('➓'), Some(10));
        assert_eq!(circled_value('1'), None);
    }
}
