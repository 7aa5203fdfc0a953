//! Collection name inflection: `BlogPost` -> `blogPosts`.

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("foot", "feet"),
    ("tooth", "teeth"),
    ("ox", "oxen"),
];

const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "deer",
    "news",
    "metadata",
];

/// Words ending in `f`/`fe` that take `ves`.
const F_TO_VES: &[&str] = &[
    "calf", "half", "knife", "leaf", "life", "loaf", "self", "shelf", "thief", "wife", "wolf",
];

/// Default collection name of a model class.
pub fn collection_name(class_name: &str) -> String {
    pluralize(&lower_camel(class_name))
}

/// Lower-case the leading capital run: `User` -> `user`, `HTTPRequest` -> `httpRequest`.
pub fn lower_camel(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let run = chars.iter().take_while(|c| c.is_uppercase()).count();
    let lower_count = match run {
        0 => 0,
        1 => 1,
        // Keep the last capital of an acronym when it starts the next word
        n if n < chars.len() && chars[n].is_lowercase() => n - 1,
        n => n,
    };

    chars
        .iter()
        .enumerate()
        .flat_map(|(i, c)| {
            if i < lower_count {
                c.to_lowercase().collect::<Vec<_>>()
            } else {
                vec![*c]
            }
        })
        .collect()
}

/// Pluralize the last camel-case segment of `word`.
pub fn pluralize(word: &str) -> String {
    let split = word
        .char_indices()
        .filter(|(i, c)| *i > 0 && c.is_uppercase())
        .map(|(i, _)| i)
        .last()
        .unwrap_or(0);
    let (head, last) = word.split_at(split);
    format!("{}{}", head, pluralize_word(last))
}

fn pluralize_word(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_lowercase();

    let plural = if UNCOUNTABLE.contains(&lower.as_str()) {
        lower.clone()
    } else if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == lower) {
        plural.to_string()
    } else if F_TO_VES.contains(&lower.as_str()) {
        let stem = lower.strip_suffix("fe").or_else(|| lower.strip_suffix('f')).unwrap_or(&lower);
        format!("{}ves", stem)
    } else if let Some(stem) = lower.strip_suffix('y').filter(|stem| ends_with_consonant(stem)) {
        format!("{}ies", stem)
    } else if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| lower.ends_with(suffix)) {
        format!("{}es", lower)
    } else {
        format!("{}s", lower)
    };

    restore_case(word, &plural)
}

fn ends_with_consonant(stem: &str) -> bool {
    stem.chars()
        .last()
        .is_some_and(|c| c.is_alphabetic() && !"aeiou".contains(c))
}

/// Re-apply the original's capitalization to the shared prefix.
fn restore_case(original: &str, plural: &str) -> String {
    let mut out = String::with_capacity(plural.len());
    let mut original_chars = original.chars();
    for c in plural.chars() {
        match original_chars.next() {
            Some(o) if o.is_uppercase() => out.extend(c.to_uppercase()),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_names() {
        let cases = [
            ("User", "users"),
            ("Category", "categories"),
            ("Box", "boxes"),
            ("Person", "people"),
            ("Day", "days"),
            ("Address", "addresses"),
            ("Branch", "branches"),
            ("Leaf", "leaves"),
            ("Sheep", "sheep"),
            ("BlogPost", "blogPosts"),
            ("SalesPerson", "salesPeople"),
            ("HTTPRequest", "httpRequests"),
        ];
        for (class_name, expected) in cases {
            assert_eq!(collection_name(class_name), expected, "for {}", class_name);
        }
    }

    #[test]
    fn test_lower_camel() {
        assert_eq!(lower_camel("User"), "user");
        assert_eq!(lower_camel("URL"), "url");
        assert_eq!(lower_camel("userId"), "userId");
        assert_eq!(lower_camel("IOStream"), "ioStream");
    }
}
