use crate::lesson::Lesson;

/// Compose the tutor's system instruction from the persona, the target
/// language, and the lesson the student just finished.
///
/// The lesson content is consumed read-only: vocabulary as a
/// "word (translation)" list, the reading passage joined into one block.
pub fn system_instruction(voice: &str, target_language: &str, lesson: &Lesson) -> String {
    format!(
        "You are '{voice}', a {language} tutor who teaches through immersion. \
The student has just finished a reading lesson titled \"{title}\".\n\
\n\
Lesson context:\n\
- Vocabulary: {vocabulary}\n\
- Reading passage: {passage}\n\
\n\
How to run the conversation:\n\
1. Greet the student warmly in {language} and introduce yourself.\n\
2. Ask exactly one question in {language} about the passage or the vocabulary above.\n\
3. Listen closely. When the student makes a grammar or pronunciation mistake in \
{language}, correct it gently in English first, explain briefly why, then have them \
repeat the corrected form in {language}.\n\
4. Keep your own turns short. The student should do most of the talking.\n\
5. The goal is for them to leave confident using the words they just learned.\n\
\n\
Begin with your greeting and first question.",
        voice = voice,
        language = target_language,
        title = lesson.title,
        vocabulary = vocabulary_line(lesson),
        passage = passage_text(lesson),
    )
}

/// Vocabulary as a comma-joined "word (translation)" list.
pub fn vocabulary_line(lesson: &Lesson) -> String {
    lesson
        .content
        .vocabulary
        .iter()
        .map(|entry| format!("{} ({})", entry.word, entry.translation))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The lesson's reading passage as one block of text.
pub fn passage_text(lesson: &Lesson) -> String {
    match &lesson.content.story {
        Some(paragraphs) if !paragraphs.is_empty() => paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(" "),
        _ => "No reading passage in this lesson.".to_string(),
    }
}
