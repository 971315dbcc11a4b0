//! Country directory: code/name table and free-text fragment dictionary

/// Sentinel used for both code and name when no country resolves
pub const UNKNOWN: &str = "Unknown";

/// Placeholder code some playlists use for "no country"
const NO_COUNTRY_CODE: &str = "XX";

/// Two-letter code to English display name
static COUNTRY_NAMES: &[(&str, &str)] = &[
    ("US", "United States"), ("GB", "United Kingdom"), ("CA", "Canada"), ("FR", "France"),
    ("DE", "Germany"), ("IT", "Italy"), ("ES", "Spain"), ("RU", "Russia"),
    ("CN", "China"), ("JP", "Japan"), ("KR", "South Korea"), ("IN", "India"),
    ("BR", "Brazil"), ("MX", "Mexico"), ("AU", "Australia"), ("NL", "Netherlands"),
    ("SE", "Sweden"), ("NO", "Norway"), ("FI", "Finland"), ("DK", "Denmark"),
    ("PL", "Poland"), ("TR", "Turkey"), ("GR", "Greece"), ("PT", "Portugal"),
    ("AR", "Argentina"), ("CL", "Chile"), ("ZA", "South Africa"), ("EG", "Egypt"),
    ("NG", "Nigeria"), ("UA", "Ukraine"), ("RO", "Romania"), ("HU", "Hungary"),
    ("CZ", "Czech Republic"), ("SK", "Slovakia"), ("BG", "Bulgaria"), ("RS", "Serbia"),
    ("HR", "Croatia"), ("SI", "Slovenia"), ("AT", "Austria"), ("CH", "Switzerland"),
    ("BE", "Belgium"), ("IE", "Ireland"), ("NZ", "New Zealand"), ("IL", "Israel"),
    ("SA", "Saudi Arabia"), ("AE", "UAE"), ("IR", "Iran"), ("IQ", "Iraq"),
    ("PK", "Pakistan"), ("ID", "Indonesia"), ("TH", "Thailand"), ("VN", "Vietnam"),
    ("MY", "Malaysia"), ("SG", "Singapore"), ("PH", "Philippines"), ("TW", "Taiwan"),
    ("HK", "Hong Kong"), ("BY", "Belarus"),
];

/// Lowercase name/demonym fragments, searched in this order (first hit wins).
/// A fragment must never follow a shorter fragment of another country that it contains,
/// which is why Ukraine is listed ahead of "uk".
static COUNTRY_FRAGMENTS: &[(&str, &str)] = &[
    ("united states", "US"), ("usa", "US"), ("america", "US"), ("american", "US"),
    ("ukraine", "UA"), ("ukrainian", "UA"),
    ("united kingdom", "GB"), ("uk", "GB"), ("britain", "GB"), ("british", "GB"),
    ("england", "GB"), ("english", "GB"),
    ("canada", "CA"), ("canadian", "CA"),
    ("france", "FR"), ("french", "FR"),
    ("germany", "DE"), ("german", "DE"),
    ("italy", "IT"), ("italian", "IT"),
    ("spain", "ES"), ("spanish", "ES"),
    ("russia", "RU"), ("russian", "RU"),
    ("china", "CN"), ("chinese", "CN"),
    ("japan", "JP"), ("japanese", "JP"),
    ("south korea", "KR"), ("korea", "KR"), ("korean", "KR"),
    ("india", "IN"), ("indian", "IN"),
    ("brazil", "BR"), ("brazilian", "BR"),
    ("mexico", "MX"), ("mexican", "MX"),
    ("australia", "AU"), ("australian", "AU"),
    ("netherlands", "NL"), ("dutch", "NL"),
    ("sweden", "SE"), ("swedish", "SE"),
    ("norway", "NO"), ("norwegian", "NO"),
    ("finland", "FI"), ("finnish", "FI"),
    ("denmark", "DK"), ("danish", "DK"),
    ("poland", "PL"), ("polish", "PL"),
    ("turkey", "TR"), ("turkish", "TR"),
    ("greece", "GR"), ("greek", "GR"),
    ("portugal", "PT"), ("portuguese", "PT"),
    ("argentina", "AR"), ("argentine", "AR"),
    ("chile", "CL"), ("chilean", "CL"),
    ("south africa", "ZA"),
    ("egypt", "EG"), ("egyptian", "EG"),
    ("nigeria", "NG"), ("nigerian", "NG"),
    ("romania", "RO"), ("romanian", "RO"),
    ("hungary", "HU"), ("hungarian", "HU"),
    ("czech republic", "CZ"), ("czech", "CZ"),
    ("slovakia", "SK"), ("slovak", "SK"),
    ("bulgaria", "BG"), ("bulgarian", "BG"),
    ("serbia", "RS"), ("serbian", "RS"),
    ("croatia", "HR"), ("croatian", "HR"),
    ("slovenia", "SI"), ("slovenian", "SI"),
    ("austria", "AT"), ("austrian", "AT"),
    ("switzerland", "CH"), ("swiss", "CH"),
    ("belgium", "BE"), ("belgian", "BE"),
    ("ireland", "IE"), ("irish", "IE"),
    ("new zealand", "NZ"),
    ("israel", "IL"), ("israeli", "IL"),
    ("saudi arabia", "SA"), ("uae", "AE"),
    ("iran", "IR"), ("iranian", "IR"),
    ("iraq", "IQ"), ("iraqi", "IQ"),
    ("pakistan", "PK"), ("pakistani", "PK"),
    ("indonesia", "ID"), ("indonesian", "ID"),
    ("thailand", "TH"), ("thai", "TH"),
    ("vietnam", "VN"), ("vietnamese", "VN"),
    ("malaysia", "MY"), ("malaysian", "MY"),
    ("singapore", "SG"),
    ("philippines", "PH"), ("filipino", "PH"),
    ("taiwan", "TW"), ("taiwanese", "TW"),
    ("hong kong", "HK"),
    ("belarus", "BY"), ("belarusian", "BY"),
];

/// A resolved country guess
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Country {
    pub code: String,
    pub name: String,
}

/// Display name for a known code
pub fn country_name(code: &str) -> Option<&'static str> {
    COUNTRY_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Reverse lookup, case-insensitive on the name
pub fn country_code(name: &str) -> Option<&'static str> {
    let name = name.trim();
    COUNTRY_NAMES
        .iter()
        .find(|(_, n)| n.eq_ignore_ascii_case(name))
        .map(|(code, _)| *code)
}

/// Exactly two alphabetic characters
pub fn is_country_code(code: &str) -> bool {
    code.chars().count() == 2 && code.chars().all(char::is_alphabetic)
}

/// Resolve a two-letter code. Codes outside the directory keep the code as their name;
/// the "XX" placeholder and anything that is not two letters resolve to nothing.
pub fn resolve(code: &str) -> Option<Country> {
    let code = code.trim().to_uppercase();
    if !is_country_code(&code) || code == NO_COUNTRY_CODE {
        return None;
    }
    let name = country_name(&code).map(str::to_string).unwrap_or_else(|| code.clone());
    Some(Country { code, name })
}

/// Substring search of the fragment dictionary against free text (group titles, channel names)
pub fn detect_from_text(text: &str) -> Option<Country> {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }
    COUNTRY_FRAGMENTS
        .iter()
        .find(|(fragment, _)| text.contains(*fragment))
        .and_then(|(_, code)| resolve(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_both_directions() {
        assert_eq!(country_name("US"), Some("United States"));
        assert_eq!(country_name("ZZ"), None);
        assert_eq!(country_code("south africa"), Some("ZA"));
        assert_eq!(country_code("Atlantis"), None);
    }

    #[test]
    fn test_resolve() {
        let de = resolve("de").unwrap();
        assert_eq!(de.code, "DE");
        assert_eq!(de.name, "Germany");

        let unlisted = resolve("QZ").unwrap();
        assert_eq!(unlisted.name, "QZ");

        assert_eq!(resolve("XX"), None);
        assert_eq!(resolve("USA"), None);
        assert_eq!(resolve("1A"), None);
    }

    #[test]
    fn test_detect_from_text() {
        assert_eq!(detect_from_text("French News").unwrap().code, "FR");
        assert_eq!(detect_from_text("  SOUTH AFRICA Sports ").unwrap().code, "ZA");
        assert_eq!(detect_from_text("Ukrainian Music").unwrap().code, "UA");
        assert_eq!(detect_from_text("UK Drama").unwrap().code, "GB");
        assert_eq!(detect_from_text("Random"), None);
        assert_eq!(detect_from_text("   "), None);
    }

    #[test]
    fn test_every_fragment_maps_to_named_country() {
        for (fragment, code) in COUNTRY_FRAGMENTS {
            assert!(country_name(code).is_some(), "{} -> {} has no name", fragment, code);
            assert_eq!(*fragment, fragment.to_lowercase());
        }
    }

    #[test]
    fn test_no_shadowing_fragments() {
        // An earlier fragment contained in a later one would steal its matches
        for (i, (earlier, earlier_code)) in COUNTRY_FRAGMENTS.iter().enumerate() {
            for (later, later_code) in &COUNTRY_FRAGMENTS[i + 1..] {
                if later.contains(earlier) {
                    assert_eq!(
                        earlier_code, later_code,
                        "'{}' ({}) shadows '{}' ({})",
                        earlier, earlier_code, later, later_code
                    );
                }
            }
        }
    }

    #[test]
    fn test_codes_are_unique() {
        let mut codes: Vec<_> = COUNTRY_NAMES.iter().map(|(c, _)| *c).collect();
        codes.sort_unstable();
        let before = codes.len();
        codes.dedup();
        assert_eq!(before, codes.len());
    }
}
