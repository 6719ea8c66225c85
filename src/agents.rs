//! Country agents negotiating a shared climate goal
//!
//! Each agent proposes a policy grounded in its country's past policies and
//! the knowledge base, then reacts to the other proposals. Agents run one
//! after another in the order the countries were given.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::chatbot::NO_CONTEXT_MARKER;
use crate::config::AgentSettings;
use crate::errors::Result;
use crate::llm::{ask, ChatModel, CompletionParams};
use crate::rag::ContextAssembler;
use crate::vector_db::Collection;

pub const DEFAULT_STANCE: &str = "balanced approach";
pub const REVISION_SEPARATOR: &str = "\n\nREVISED PROPOSAL:\n";

/// Policy advisor for one country
pub struct CountryAgent {
    country: String,
    stance: String,
    model: Arc<dyn ChatModel>,
    params: CompletionParams,
    memory: Vec<String>,
}

impl CountryAgent {
    pub fn new(
        country: impl Into<String>,
        model: Arc<dyn ChatModel>,
        stance: Option<String>,
        params: CompletionParams,
    ) -> Self {
        Self {
            country: country.into(),
            stance: stance.unwrap_or_else(|| DEFAULT_STANCE.to_string()),
            model,
            params,
            memory: Vec::new(),
        }
    }

    /// Propose a policy for `goal` informed by this country's policies
    /// since `year` and the knowledge base
    pub async fn propose_policy(
        &mut self,
        assembler: &ContextAssembler,
        goal: &str,
        policies: &Collection,
        knowledge: &Collection,
        year: i32,
    ) -> Result<String> {
        let k = assembler.settings().k;
        let history = assembler
            .retrieve_country_policies(&self.country, goal, policies, year, k)
            .await?;
        let background = assembler.retrieve_knowledge(goal, knowledge, k).await?;

        let prompt = format!(
            "You are the policy advisor for {country}, which has a {stance}.\n\n\
             Shared goal: {goal}\n\n\
             Historical policies for {country}:\n{history}\n\n\
             Relevant knowledge base items:\n{background}\n\n\
             Based on your country's interests and history, propose a new climate policy \
             for {country} that aligns with the shared goal. \
             You may also highlight any points of potential contention or \
             unique considerations for {country}.",
            country = self.country,
            stance = self.stance,
            goal = goal,
            history = history.text_or(NO_CONTEXT_MARKER),
            background = background.text_or(NO_CONTEXT_MARKER),
        );

        let proposal = ask(self.model.as_ref(), &prompt, self.params).await?;
        tracing::info!(country = %self.country, "proposal drafted");
        self.memory.push(proposal.clone());
        Ok(proposal)
    }

    /// Critique the other countries' proposals and revise this one
    pub async fn react_to_other_policies(&mut self, other_policies: &str) -> Result<String> {
        let prompt = format!(
            "You are {country}'s policy advisor, with a {stance}.\n\n\
             Other countries have proposed the following policies:\n{others}\n\n\
             Your task:\n\
             1. Critique or debate these proposals from the perspective of {country}. \
             Identify any conflicts, disagreements, or potential synergies.\n\
             2. If needed, refine or adjust your own policy to protect or promote your \
             country's interests and approach.\n\
             3. Provide a clear statement of how your revised policy stands in contrast \
             or alignment with the others.",
            country = self.country,
            stance = self.stance,
            others = other_policies,
        );

        let reaction = ask(self.model.as_ref(), &prompt, self.params).await?;
        tracing::info!(country = %self.country, "reaction drafted");
        self.memory.push(reaction.clone());
        Ok(reaction)
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn stance(&self) -> &str {
        &self.stance
    }

    /// Everything this agent has said, oldest first
    pub fn memory(&self) -> &[String] {
        &self.memory
    }
}

/// Final position of one country
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryPosition {
    pub country: String,
    pub proposal: String,
}

/// Shared inputs of one discussion round
pub struct Discussion<'a> {
    pub model: Arc<dyn ChatModel>,
    pub assembler: &'a ContextAssembler,
    pub policies: &'a Collection,
    pub knowledge: &'a Collection,
    pub settings: &'a AgentSettings,
}

impl Discussion<'_> {
    /// Every country proposes, then every country reacts to the current
    /// proposals of the others. A country's final text is its proposal,
    /// the revision separator and its reaction. Output follows input order;
    /// repeated countries take part once.
    pub async fn run(
        &self,
        countries: &[String],
        goal: &str,
        year: i32,
        stances: &HashMap<String, String>,
    ) -> Result<Vec<CountryPosition>> {
        let params = CompletionParams::new(self.settings.temperature, self.settings.max_tokens);

        let mut agents: Vec<CountryAgent> = Vec::with_capacity(countries.len());
        for country in countries {
            if agents.iter().any(|a| a.country() == country) {
                tracing::warn!(country = %country, "duplicate country ignored");
                continue;
            }
            agents.push(CountryAgent::new(
                country.clone(),
                self.model.clone(),
                stances.get(country).cloned(),
                params,
            ));
        }

        let mut positions = Vec::with_capacity(agents.len());
        for agent in &mut agents {
            let proposal = agent
                .propose_policy(self.assembler, goal, self.policies, self.knowledge, year)
                .await?;
            positions.push(CountryPosition {
                country: agent.country().to_string(),
                proposal,
            });
        }

        for (i, agent) in agents.iter_mut().enumerate() {
            let others = positions
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, p)| format!("{} proposed: {}", p.country, p.proposal))
                .collect::<Vec<_>>()
                .join("\n");
            let reaction = agent.react_to_other_policies(&others).await?;
            positions[i].proposal.push_str(REVISION_SEPARATOR);
            positions[i].proposal.push_str(&reaction);
        }

        Ok(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingModel {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatModel for CountingModel {
        async fn complete(&self, messages: &[ChatMessage], _params: CompletionParams) -> Result<String> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(messages.last().map(|m| m.content.clone()).unwrap_or_default());
            Ok(format!("reply {}", prompts.len()))
        }
    }

    #[tokio::test]
    async fn test_react_records_memory() {
        let model = Arc::new(CountingModel::default());
        let mut agent = CountryAgent::new("France", model.clone(), None, CompletionParams::new(0.7, 100));

        assert_eq!(agent.stance(), DEFAULT_STANCE);
        let reaction = agent.react_to_other_policies("Germany proposed: coal exit").await.unwrap();

        assert_eq!(reaction, "reply 1");
        assert_eq!(agent.memory(), &["reply 1".to_string()]);
        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains("France's policy advisor, with a balanced approach"));
        assert!(prompts[0].contains("Germany proposed: coal exit"));
    }
}
