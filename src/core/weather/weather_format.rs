// Pure helpers that turn raw forecast values into display text.

/// Languages the forecast API can write summaries in.
pub const FORECAST_SUPPORTED_LANGS: &[&str] = &[
    "ar", "az", "be", "bg", "bn", "bs", "ca", "cs", "da", "de", "el", "en", "eo", "es", "et",
    "fi", "fr", "he", "hi", "hr", "hu", "id", "is", "it", "ja", "ka", "kn", "ko", "kw", "lv",
    "ml", "mr", "nb", "nl", "no", "pa", "pl", "pt", "ro", "ru", "sk", "sl", "sr", "sv", "ta",
    "te", "tr", "uk", "ur", "x-pig-latin", "zh", "zh-tw",
];

const COMPASS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

const UNKNOWN_STATE: &str = "\u{2754}";

/// Pick the forecast language for the bot's locale, falling back to English.
pub fn forecast_language(locale: &str) -> String {
    let lang = match locale {
        "lol-US" => "x-pig-latin".to_string(),
        "debugging" => "en".to_string(),
        "zh-TW" => "zh-tw".to_string(),
        other => other.chars().take(2).collect(),
    };

    if FORECAST_SUPPORTED_LANGS.contains(&lang.as_str()) {
        lang
    } else {
        "en".to_string()
    }
}

/// 16-point compass direction for a wind bearing in degrees.
pub fn wind_bearing_direction(bearing: f64) -> &'static str {
    let index = ((bearing / 22.5) + 0.5).floor() as i64;
    COMPASS[index.rem_euclid(16) as usize]
}

/// Emoji for a lunation number (0 = new moon, 0.5 = full moon).
pub fn moon_phase_emoji(phase: f64) -> String {
    let emoji = if phase == 0.0 || phase == 1.0 {
        "\u{1F311}"
    } else if phase > 0.0 && phase < 0.25 {
        "\u{1F312}"
    } else if phase == 0.25 {
        "\u{1F313}"
    } else if phase > 0.25 && phase < 0.5 {
        "\u{1F314}"
    } else if phase == 0.5 {
        "\u{1F315}"
    } else if phase > 0.5 && phase < 0.75 {
        "\u{1F316}"
    } else if phase == 0.75 {
        "\u{1F317}"
    } else if phase > 0.75 && phase < 1.0 {
        "\u{1F318}"
    } else {
        return phase.to_string();
    };
    emoji.to_string()
}

/// Emoji for a forecast icon name.
pub fn weather_state_emoji(icon: Option<&str>) -> &'static str {
    match icon {
        Some("clear-day") => "\u{2600}",
        Some("clear-night") | Some("partly-cloudy-night") => "\u{1F303}",
        Some("rain") => "\u{1F327}",
        Some("snow") => "\u{1F328}",
        Some("sleet") => "\u{2744}",
        Some("wind") => "\u{1F32C}",
        Some("fog") => "\u{1F32B}",
        Some("cloudy") => "\u{1F325}",
        Some("partly-cloudy-day") => "\u{1F324}",
        _ => UNKNOWN_STATE,
    }
}

pub fn precip_type_label(precip_type: &str) -> String {
    match precip_type {
        "rain" => "Rain".to_string(),
        "snow" => "Snow".to_string(),
        "sleet" => "Sleet".to_string(),
        other => other.to_string(),
    }
}

/// Fraction in `0..=1` as a whole percentage, truncated.
pub fn percent(fraction: f64) -> i64 {
    (fraction * 100.0) as i64
}

/// Collapse whitespace and cut `text` on a word boundary so that it fits in
/// `width` characters including the trailing `…`.
pub fn shorten(text: &str, width: usize) -> String {
    const PLACEHOLDER: &str = "…";

    let words: Vec<&str> = text.split_whitespace().collect();
    let collapsed = words.join(" ");
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let budget = width.saturating_sub(PLACEHOLDER.chars().count());
    let mut out = String::new();
    for word in words {
        let extra = if out.is_empty() { 0 } else { 1 };
        if out.chars().count() + extra + word.chars().count() > budget {
            break;
        }
        if extra == 1 {
            out.push(' ');
        }
        out.push_str(word);
    }

    if out.is_empty() {
        // A single word longer than the budget: hard cut.
        out = collapsed.chars().take(budget).collect();
    }
    out.push_str(PLACEHOLDER);
    out
}

/// Render an optional reading, `N/A` when the API left it out.
pub fn reading(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_to_language() {
        assert_eq!(forecast_language("en-US"), "en");
        assert_eq!(forecast_language("de-DE"), "de");
        assert_eq!(forecast_language("zh-TW"), "zh-tw");
        assert_eq!(forecast_language("lol-US"), "x-pig-latin");
        assert_eq!(forecast_language("debugging"), "en");
        assert_eq!(forecast_language("xx-YY"), "en");
    }

    #[test]
    fn compass_points() {
        assert_eq!(wind_bearing_direction(0.0), "N");
        assert_eq!(wind_bearing_direction(11.0), "N");
        assert_eq!(wind_bearing_direction(12.0), "NNE");
        assert_eq!(wind_bearing_direction(90.0), "E");
        assert_eq!(wind_bearing_direction(225.0), "SW");
        assert_eq!(wind_bearing_direction(350.0), "N");
    }

    #[test]
    fn moon_phases() {
        assert_eq!(moon_phase_emoji(0.0), "\u{1F311}");
        assert_eq!(moon_phase_emoji(0.1), "\u{1F312}");
        assert_eq!(moon_phase_emoji(0.5), "\u{1F315}");
        assert_eq!(moon_phase_emoji(0.8), "\u{1F318}");
        assert_eq!(moon_phase_emoji(1.5), "1.5");
    }

    #[test]
    fn unknown_icons_get_a_question_mark() {
        assert_eq!(weather_state_emoji(Some("tornado")), UNKNOWN_STATE);
        assert_eq!(weather_state_emoji(None), UNKNOWN_STATE);
        assert_eq!(weather_state_emoji(Some("rain")), "\u{1F327}");
    }

    #[test]
    fn shorten_cuts_on_words() {
        assert_eq!(shorten("Hello   world", 20), "Hello world");
        assert_eq!(shorten("Hello world again", 12), "Hello world…");
        assert_eq!(shorten("Supercalifragilistic", 6), "Super…");
    }

    #[test]
    fn readings_and_percentages() {
        assert_eq!(reading(None), "N/A");
        assert_eq!(reading(Some(12.5)), "12.5");
        assert_eq!(percent(0.999), 99);
        assert_eq!(percent(0.25), 25);
    }
}
