use crate::domain::diagnosis::Diagnosis;
use crate::domain::goal::{Goal, EMERGENCY_FUND_NAME};
use crate::domain::plan::FinancialPlan;
use crate::domain::profile::Profile;
use crate::prompt::context::{assemble_context, ConversationContext};
use crate::prompt::{
    joined, money, plan_lines, profile_lines, render_blocks, section, DIAGNOSIS_DIGEST_HEADER,
    GOALS_DIGEST_HEADER, PLAN_DIGEST_HEADER, PROFILE_HEADER,
};

const JSON_ONLY: &str = "Retorne OBRIGATORIAMENTE um único objeto JSON, sem markdown e sem texto \
                         fora do JSON, exatamente com a estrutura abaixo:";

const TONE_RULES: &str = "IMPORTANTE:\n\
- Use linguagem simples e acessível\n\
- Seja prático, realista e motivador\n\
- Considere a realidade financeira brasileira\n\
- Valores em reais (R$)";

fn profile_block(p: &Profile) -> Option<String> {
    section(PROFILE_HEADER, profile_lines(p))
}

fn diagnosis_digest(d: Option<&Diagnosis>) -> Option<String> {
    let d = d.filter(|d| !d.is_blank())?;
    section(
        DIAGNOSIS_DIGEST_HEADER,
        vec![
            ("Situação", d.current_situation.trim().to_string()),
            (
                "Risco",
                d.risk_level
                    .map(|r| r.label_pt().to_string())
                    .unwrap_or_default(),
            ),
            ("Oportunidades", joined(&d.opportunities)),
        ],
    )
}

fn plan_digest(p: Option<&FinancialPlan>) -> Option<String> {
    let p = p.filter(|p| !p.is_blank())?;
    section(PLAN_DIGEST_HEADER, plan_lines(p))
}

fn goals_digest(goals: &[Goal]) -> Option<String> {
    if goals.is_empty() {
        return None;
    }
    let lines: Vec<String> = goals
        .iter()
        .map(|g| format!("- {}: {}", g.name.trim(), money(g.total_amount)))
        .collect();
    Some(format!("{GOALS_DIGEST_HEADER}\n{}", lines.join("\n")))
}

fn schema(lines: &[&str]) -> String {
    format!("{JSON_ONLY}\n{}", lines.join("\n"))
}

pub fn diagnosis_prompt(profile: &Profile) -> String {
    render_blocks(vec![
        Some(
            "Você é um consultor financeiro pessoal. Com base nos dados a seguir, gere um \
             diagnóstico financeiro totalmente personalizado."
                .to_string(),
        ),
        profile_block(profile),
        Some(
            [
                "CRIE:",
                "1) Resumo da situação atual",
                "2) Pontos fortes",
                "3) Pontos fracos",
                "4) Risco financeiro: exatamente um de \"baixo\", \"médio\" ou \"alto\"",
                "5) Exatamente 3 oportunidades práticas",
                "6) Conclusão motivadora",
            ]
            .join("\n"),
        ),
        Some(TONE_RULES.to_string()),
        Some(schema(&[
            "{",
            "  \"situacao_atual\": string,",
            "  \"pontos_fortes\": [string],",
            "  \"pontos_fracos\": [string],",
            "  \"risco\": \"baixo\" | \"médio\" | \"alto\",",
            "  \"oportunidades\": [string, string, string],",
            "  \"conclusao\": string",
            "}",
        ])),
    ])
}

pub fn plan_prompt(profile: &Profile, diagnosis: Option<&Diagnosis>) -> String {
    render_blocks(vec![
        Some(
            "Você é um consultor financeiro experiente. Com base nos dados abaixo, crie um \
             plano financeiro completo e prático."
                .to_string(),
        ),
        profile_block(profile),
        diagnosis_digest(diagnosis),
        Some(
            [
                "CRIE UM PLANO FINANCEIRO COM:",
                "1) Orçamento ideal pela regra 50/30/20 aplicada à renda: essenciais (50%), \
                 lazer (30%), investimento (20%). A soma deve ser igual à renda mensal.",
                "2) Gastos sugeridos por categoria, redistribuindo os gastos atuais.",
                "3) Quanto guardar por mês, realista diante da renda, dos gastos e das dívidas.",
                "4) Exatamente 3 ações práticas para reduzir gastos.",
                "5) Plano passo a passo para atingir o objetivo dentro do prazo desejado.",
                "6) Estratégia para dívidas: priorização e método de pagamento; sem dívidas, \
                 oriente sobre prevenção.",
                "7) Exatamente 3 erros a evitar, específicos para este perfil.",
                "8) Mensagem final motivadora.",
            ]
            .join("\n"),
        ),
        Some(TONE_RULES.to_string()),
        Some(schema(&[
            "{",
            "  \"orcamento_ideal\": { \"essenciais\": number, \"lazer\": number, \"investimento\": number },",
            "  \"gastos_categoria\": { \"essenciais\": number, \"lazer\": number, \"investimento\": number },",
            "  \"valor_guardar\": number,",
            "  \"acoes_reducao\": [string, string, string],",
            "  \"plano_objetivo\": string,",
            "  \"estrategia_dividas\": string,",
            "  \"erros_evitar\": [string, string, string],",
            "  \"mensagem_final\": string",
            "}",
        ])),
    ])
}

pub fn goals_prompt(
    profile: &Profile,
    diagnosis: Option<&Diagnosis>,
    plan: Option<&FinancialPlan>,
) -> String {
    render_blocks(vec![
        Some(
            "Você é um consultor financeiro especializado em planejamento de metas. Com base \
             nos dados abaixo, crie metas financeiras SMART (específicas, mensuráveis, \
             atingíveis, relevantes e temporais)."
                .to_string(),
        ),
        profile_block(profile),
        diagnosis_digest(diagnosis),
        plan_digest(plan),
        Some(format!(
            "CRIE DE 3 A 4 METAS PRIORITÁRIAS.\n\
             REGRAS:\n\
             1. A primeira meta é SEMPRE \"{EMERGENCY_FUND_NAME}\" (3 a 6 meses de gastos essenciais), \
             independentemente do objetivo principal\n\
             2. A segunda meta está ligada ao objetivo principal do usuário\n\
             3. Inclua metas de curto, médio e longo prazo\n\
             4. valor_total e valor_mensal são maiores que zero e cabem na renda disponível\n\
             5. prazo_ideal é escrito como \"N meses\" ou \"N anos\"\n\
             6. justificativa tem 1 a 2 frases"
        )),
        Some(TONE_RULES.to_string()),
        Some(schema(&[
            "{",
            "  \"metas\": [",
            "    {",
            "      \"nome\": string,",
            "      \"valor_total\": number,",
            "      \"valor_mensal\": number,",
            "      \"prazo_ideal\": string,",
            "      \"justificativa\": string",
            "    }",
            "  ]",
            "}",
        ])),
    ])
}

pub fn checklist_prompt(
    profile: &Profile,
    diagnosis: Option<&Diagnosis>,
    plan: Option<&FinancialPlan>,
    goals: &[Goal],
) -> String {
    render_blocks(vec![
        Some(
            "Você é um consultor financeiro especializado em criar rotinas práticas. Com base \
             nos dados abaixo, crie um checklist financeiro personalizado e acionável."
                .to_string(),
        ),
        profile_block(profile),
        diagnosis_digest(diagnosis),
        plan_digest(plan),
        goals_digest(goals),
        Some(
            [
                "CRIE UM CHECKLIST COM:",
                "1) Exatamente 2 ações diárias: hábitos simples de controle e consciência financeira.",
                "2) Exatamente 3 ações semanais: revisão e planejamento da semana.",
                "3) Exatamente 3 ações mensais: fechamento do mês e revisão de metas.",
                "4) Exatamente 1 ação única: algo feito UMA VEZ com impacto duradouro.",
                "Todas as ações devem ser específicas, práticas e alcançáveis.",
            ]
            .join("\n"),
        ),
        Some(TONE_RULES.to_string()),
        Some(schema(&[
            "{",
            "  \"diarias\": [string, string],",
            "  \"semanais\": [string, string, string],",
            "  \"mensais\": [string, string, string],",
            "  \"acao_unica\": string",
            "}",
        ])),
    ])
}

pub fn chat_prompt(message: &str, ctx: &ConversationContext) -> String {
    let context = assemble_context(ctx);
    render_blocks(vec![
        Some(
            "Você é o FinMind, um assistente financeiro pessoal inteligente, amigável e \
             motivador. Ajude o usuário a tomar decisões financeiras melhores com respostas \
             personalizadas."
                .to_string(),
        ),
        (!context.is_empty()).then(|| format!("CONTEXTO DO USUÁRIO:\n\n{context}")),
        Some(format!("PERGUNTA DO USUÁRIO:\n\"{}\"", message.trim())),
        Some(
            [
                "INSTRUÇÕES PARA A RESPOSTA:",
                "1. Responda diretamente à pergunta, citando os dados do usuário quando existirem.",
                "2. Dê exatamente 3 passos práticos, numerados como Passo 1, Passo 2 e Passo 3.",
                "3. Termine com exatamente uma pergunta que convide o usuário a continuar a conversa.",
                "",
                "FORMATO:",
                "[Resposta direta e personalizada]",
                "",
                "**3 Passos Práticos:**",
                "",
                "**Passo 1:** [ação]",
                "**Passo 2:** [ação]",
                "**Passo 3:** [ação]",
                "",
                "[Pergunta engajadora]",
            ]
            .join("\n"),
        ),
        Some(format!(
            "{TONE_RULES}\n- Evite jargões financeiros\n- Máximo de 200 palavras"
        )),
        Some("Responda agora:".to_string()),
    ])
}
