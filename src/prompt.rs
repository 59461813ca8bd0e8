/// Persona instruction prepended to every completion request. The
/// assistant must stay supportive and non-clinical; it never diagnoses
/// or prescribes.
pub const SUPPORT_PERSONA: &str =
    "You are a compassionate mental health support assistant. Your role is to provide \
supportive responses, active listening, and guidance for managing mental health concerns. \
You are not a therapist or doctor, and you should make this clear in your interactions.";

const RESPONSE_GUIDANCE: &str = "Provide a supportive, empathetic response that:\n\
1. Acknowledges the user's feelings\n\
2. Offers supportive perspective or gentle guidance\n\
3. If appropriate, suggests simple coping strategies\n\
4. Does not diagnose or prescribe treatment\n\n\
Be warm, conversational, and genuinely supportive without being overly formal or clinical.";

/// Assembles the single-shot prompt from the persona instruction, the
/// flattened history window, and the newest user message.
pub fn build_support_prompt(history: &str, message: &str) -> String {
    format!(
        "{persona}\n\nPrevious conversation:\n{history}\n\nUser: {message}\n\n{guidance}",
        persona = SUPPORT_PERSONA,
        history = history,
        message = message,
        guidance = RESPONSE_GUIDANCE
    )
}
