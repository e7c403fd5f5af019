//! Prompt catalog for the text oracle.
//!
//! One persona prompt per response strategy plus the analysis prompts for
//! complexity classification, cluster assignment and similarity judgment.
//! Rendering is plain placeholder substitution.

use crate::types::Strategy;

const CONCISE_PROMPT: &str = "You are a helpful assistant focused on brevity and clarity. \
Answer the question concisely based on the context provided.

Context:
{context}

Question: {question}

Provide a brief, direct answer in 2-3 sentences. Focus only on the essential information.";

const DETAILED_PROMPT: &str = "You are a knowledgeable assistant specializing in comprehensive \
explanations. Provide a thorough and detailed answer based on the context.

Context:
{context}

Question: {question}

Give a detailed, well-explained answer that covers:
- Main concepts and definitions
- Supporting details and examples
- Relevant background information
- Any important nuances or caveats

Use multiple paragraphs if needed to fully address the question.";

const STRUCTURED_PROMPT: &str = "You are an analytical assistant who organizes information \
systematically. Provide a well-structured answer based on the context.

Context:
{context}

Question: {question}

Structure your answer with clear organization:
1. Start with a brief overview
2. Break down the information into logical sections or points
3. Use clear transitions between ideas
4. Conclude with a summary if appropriate

Make the structure easy to follow and scan.";

const EXAMPLE_DRIVEN_PROMPT: &str = "You are a practical assistant who explains through concrete \
examples. Answer the question by providing real-world examples and analogies based on the context.

Context:
{context}

Question: {question}

Provide an answer that:
- Uses specific examples to illustrate key points
- Includes analogies or comparisons to familiar concepts
- Shows practical applications or use cases
- Makes abstract concepts concrete and relatable

Focus on making the answer tangible and easy to understand through examples.";

const ANALYTICAL_PROMPT: &str = "You are a critical thinking assistant who provides in-depth \
analysis. Answer the question with analytical depth based on the context.

Context:
{context}

Question: {question}

Provide an analytical answer that:
- Examines the question from multiple angles
- Discusses implications and relationships
- Compares and contrasts different aspects
- Identifies patterns, causes, or effects
- Considers limitations or alternative perspectives

Prioritize depth of understanding and critical analysis.";

const COMPLEXITY_PROMPT: &str = "Analyze this query and determine its complexity level:

Query: {query}

Consider:
- Length and specificity of the query
- Technical depth required
- Whether it asks for definitions, explanations, analysis, or examples
- Scope (narrow vs broad topic)

Respond with ONLY ONE WORD: simple, moderate, or complex";

const CLUSTERING_PROMPT: &str = "Analyze and categorize this query into a semantic group.

Query: {query}

Previous query groups and examples:
{existing_groups}

Task:
1. Determine if this query belongs to an existing group based on semantic similarity (not just word matching)
2. If it's similar to an existing group, return that group name
3. If it's a new type of query, create a descriptive group name (2-4 words)

Consider:
- Intent of the query (what, why, how, when, etc.)
- Topic domain (technical, general knowledge, procedural, etc.)
- Level of detail requested (overview, specific detail, comparison, etc.)

Respond in this exact format:
GROUP: [group_name]
REASON: [one sentence explaining why]";

const SIMILARITY_PROMPT: &str = "Evaluate if these two queries are semantically similar \
(asking for the same type of information).

Query 1: {query1}
Query 2: {query2}

Consider:
- Do they ask about the same topic or concept?
- Do they have the same intent (definition, explanation, comparison, etc.)?
- Would the same answer strategy work well for both?

Respond with ONLY ONE WORD: SIMILAR or DIFFERENT";

/// Render the persona prompt for a strategy with retrieved context.
pub fn strategy_prompt(strategy: Strategy, context: &str, question: &str) -> String {
    let template = match strategy {
        Strategy::Concise => CONCISE_PROMPT,
        Strategy::Detailed => DETAILED_PROMPT,
        Strategy::Structured => STRUCTURED_PROMPT,
        Strategy::ExampleDriven => EXAMPLE_DRIVEN_PROMPT,
        Strategy::Analytical => ANALYTICAL_PROMPT,
    };
    template
        .replace("{context}", context)
        .replace("{question}", question)
}

pub fn complexity_prompt(query: &str) -> String {
    COMPLEXITY_PROMPT.replace("{query}", query)
}

pub fn clustering_prompt(query: &str, existing_groups: &str) -> String {
    CLUSTERING_PROMPT
        .replace("{query}", query)
        .replace("{existing_groups}", existing_groups)
}

pub fn similarity_prompt(first: &str, second: &str) -> String {
    SIMILARITY_PROMPT
        .replace("{query1}", first)
        .replace("{query2}", second)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_prompt_fills_both_slots() {
        let prompt = strategy_prompt(Strategy::Concise, "some passages", "what is rust?");
        assert!(prompt.contains("some passages"));
        assert!(prompt.contains("what is rust?"));
        assert!(!prompt.contains("{context}"));
        assert!(!prompt.contains("{question}"));
    }

    #[test]
    fn each_strategy_has_a_distinct_persona() {
        let prompts: Vec<String> = Strategy::ALL
            .iter()
            .map(|s| strategy_prompt(*s, "c", "q"))
            .collect();
        for (i, a) in prompts.iter().enumerate() {
            for b in prompts.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn clustering_prompt_carries_group_contract() {
        let prompt = clustering_prompt("what is ml?", "- ml_definition: what is ml");
        assert!(prompt.contains("GROUP:"));
        assert!(prompt.contains("- ml_definition: what is ml"));
    }
}
