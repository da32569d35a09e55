//! services/api/src/adapters/plan_llm.rs
//!
//! This module contains the adapter for the plan-generating LLM.
//! It implements the `PlanGenerationService` port from the `core` crate.
//!
//! Everything the model returns is treated as untrusted text: this adapter
//! only gets it parsed into a draft struct. Structural validation happens in
//! the core before anything is persisted.

const PROGRAM_SYSTEM_INSTRUCTIONS: &str = r#"You are a certified strength coach generating a structured training program.

You receive a JSON payload with the user's profile (age, sex, weight, height, activity level, primary goal) and their questionnaire answers (days per week, minutes per session, intensity, available equipment, extra activities). Some profile fields may be missing; fall back to sensible defaults for a healthy adult.

Respond with ONLY a JSON object, no prose and no Markdown fences, in exactly this shape:

{
  "program_title": "string",
  "goal": "string",
  "level": "beginner|intermediate|advanced",
  "duration_weeks": 8,
  "workouts": [
    {
      "day_number": 1,
      "title": "string",
      "exercises": [
        {
          "name": "string",
          "sets": 3,
          "reps": "8-12",
          "rest_sec": 90,
          "weight_hint": "optional string",
          "notes": "optional string"
        }
      ]
    }
  ],
  "final_note": "optional string"
}

Rules:
- The number of workouts must equal the requested days per week.
- day_number values start at 1 and must be unique.
- Every workout needs at least one exercise; sets >= 1; rest_sec >= 0.
- Only use equipment the user listed. Bodyweight is always available."#;

const DIET_SYSTEM_INSTRUCTIONS: &str = r#"You are a registered dietitian generating a one-day meal plan.

You receive a JSON payload with the user's profile (age, sex, weight, height, activity level, primary goal, dietary preferences, allergies) and their answers (meals per day, calorie target, exclusions). Some fields may be missing; use sensible defaults for a healthy adult.

Respond with ONLY a JSON object, no prose and no Markdown fences, in exactly this shape:

{
  "total_kcal": 2200,
  "macros_target": { "protein_g": 160, "carbs_g": 220, "fat_g": 70 },
  "meals": [
    {
      "id": "breakfast",
      "title": "string",
      "time": "08:00",
      "kcal": 500,
      "ingredients": [
        { "name": "string", "amount": 80, "unit": "g" }
      ]
    }
  ]
}

Rules:
- Each meal's "id" must be one of: breakfast, lunch, snack, dinner, used at most once.
- Never include ingredients that match the user's allergies or exclusions.
- total_kcal and every kcal value must be >= 0; ingredient amounts must be > 0."#;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use wellness_core::domain::{AssembledProfile, DietAnswers, DraftDietPlan, DraftProgram, WorkoutAnswers};
use wellness_core::ports::{PlanGenerationService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `PlanGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiPlanAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    /// Per-call ceiling. Model latency dominates, so this is much longer
    /// than an ordinary request timeout (default 90s).
    timeout: Duration,
}

impl OpenAiPlanAdapter {
    /// Creates a new `OpenAiPlanAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String, timeout: Duration) -> Self {
        Self {
            client,
            model,
            timeout,
        }
    }

    async fn complete(&self, system: &str, user_payload: String) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| PortError::GenerationFailed(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_payload)
                .build()
                .map_err(|e| PortError::GenerationFailed(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::GenerationFailed(e.to_string()))?;

        let chat = self.client.chat();
        let call = chat.create(request);
        let response = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                PortError::GenerationFailed(format!(
                    "provider call exceeded {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e: OpenAIError| PortError::GenerationFailed(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::GenerationFailed("provider returned no text content".to_string())
            })?;
        Ok(content)
    }
}

/// Strips Markdown code fences the model sometimes wraps around its JSON.
fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

fn parse_draft<T: DeserializeOwned>(raw: &str) -> PortResult<T> {
    serde_json::from_str(extract_json(raw))
        .map_err(|e| PortError::GenerationFailed(format!("provider output is not valid JSON: {e}")))
}

fn request_payload<A: serde::Serialize>(
    profile: &AssembledProfile,
    answers: &A,
) -> PortResult<String> {
    let payload = serde_json::json!({
        "profile": profile,
        "answers": answers,
    });
    serde_json::to_string_pretty(&payload)
        .map_err(|e| PortError::GenerationFailed(e.to_string()))
}

//=========================================================================================
// `PlanGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl PlanGenerationService for OpenAiPlanAdapter {
    /// Generates a training-plan draft from the assembled profile and answers.
    async fn generate_program(
        &self,
        profile: &AssembledProfile,
        answers: &WorkoutAnswers,
    ) -> PortResult<DraftProgram> {
        let payload = request_payload(profile, answers)?;
        let raw = self.complete(PROGRAM_SYSTEM_INSTRUCTIONS, payload).await?;
        parse_draft(&raw)
    }

    /// Generates a diet-plan draft.
    async fn generate_diet(
        &self,
        profile: &AssembledProfile,
        answers: &DietAnswers,
    ) -> PortResult<DraftDietPlan> {
        let payload = request_payload(profile, answers)?;
        let raw = self.complete(DIET_SYSTEM_INSTRUCTIONS, payload).await?;
        parse_draft(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_passes_bare_objects_through() {
        assert_eq!(extract_json("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn extract_json_strips_fences() {
        assert_eq!(extract_json("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(extract_json("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn parse_draft_accepts_fenced_program_json() {
        let raw = r#"```json
{
  "program_title": "Base Block",
  "goal": "general_fitness",
  "level": "beginner",
  "duration_weeks": 4,
  "workouts": [
    {
      "day_number": 1,
      "title": "Full Body",
      "exercises": [
        { "name": "Squat", "sets": 3, "reps": "10", "rest_sec": 90 }
      ]
    }
  ],
  "finalNote": "Ease in."
}
```"#;
        let draft: DraftProgram = parse_draft(raw).unwrap();
        assert_eq!(draft.workouts.len(), 1);
        assert_eq!(draft.final_note.as_deref(), Some("Ease in."));
    }

    #[test]
    fn parse_draft_rejects_prose() {
        let err = parse_draft::<DraftProgram>("Here is your plan!").unwrap_err();
        assert!(matches!(err, PortError::GenerationFailed(_)));
    }
}
