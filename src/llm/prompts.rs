pub fn suggestions_prompt() -> String {
    r#"Generate 20 diverse and interesting quiz category suggestions for a "top items" learning app.

Include a mix of:
- Broad categories (e.g., "movie stars", "car brands")
- Time-specific categories (e.g., "80s rock bands", "2010s pop stars")
- Niche/specific categories (e.g., "TikTok stars from 2020", "French impressionist painters")
- Geographic categories (e.g., "Japanese video game companies", "British monarchs")
- Achievement-based (e.g., "Nobel Prize winners in Physics", "Olympic gold medalists in swimming")

Return a JSON object with:
- "suggestions": An array of exactly 20 strings, each being a quiz category

Make them fun, educational, and varied. Keep each suggestion concise (2-6 words).
Return ONLY the JSON object, no markdown."#
        .to_string()
}

pub fn item_list_prompt(category: &str, count: u32, language_instruction: &str) -> String {
    format!(
        r#"You are helping create a study guide. The user wants to learn the top {count} {category}.

Return a JSON object with exactly these two fields:
1. "items": An array of exactly {count} strings (just names, no objects), ranked from most notable/important to least
2. "properties": An array of 3-5 property names as strings, using snake_case

For properties, include:
- Basic facts (birth_date, founded_year, country, etc.)
- At least ONE list-type property that shows notable works/achievements (e.g., notable_movies, top_songs, famous_works, popular_models, key_inventions, championship_wins)

Examples by category:
- movie stars: ["birth_date", "nationality", "notable_movies", "awards_won"]
- bands: ["formed_year", "genre", "top_songs", "members"]
- car brands: ["founded_year", "country", "popular_models", "known_for"]

Be factual and use commonly accepted rankings. Return ONLY the JSON object, no markdown or other text.{language_instruction}"#
    )
}

pub fn item_details_prompt(
    item: &str,
    category: &str,
    properties: &[String],
    language: &str,
    language_instruction: &str,
) -> String {
    let properties_str = if properties.is_empty() {
        "relevant characteristics".to_string()
    } else {
        properties.join(", ")
    };

    // Non-English answers still need English names for the image lookup.
    let english_fields = if language != "en" {
        "\n- \"english_name\": The standard English name for this item (for image lookup)\n- \"english_category\": The English translation of the category context"
    } else {
        ""
    };

    format!(
        r#"Provide details about "{item}" in the context of {category}.

Return a JSON object with:
- "name": Full/official name
- "description": 2-3 sentence summary
- "properties": Object with values for each of: {properties_str}{english_fields}

IMPORTANT JSON RULES:
1. ALL string values MUST be in double quotes, including dates, years, and descriptions
2. For properties with multiple items (like notable_works, top_songs), use JSON arrays: ["Item 1", "Item 2", "Item 3"]
3. Never use unquoted values - even "9th century" must be "9th century" in quotes

Be concise and factual. Return ONLY valid JSON.{language_instruction}"#
    )
}
