//! The static section registry.
//!
//! Every field the summary must contain is a [`SectionSpec`]: a unique name
//! (which doubles as the `## <name>` heading the model must emit and as the
//! Notion property name), the instruction text sent to the model, and the
//! flags that drive the round protocol and the publish mapping.
//!
//! The registry is an ordered list built once at start-up. Order matters: it
//! is the order sections are requested in prompts and rendered in the page
//! body.

use crate::config::SummaryMode;
use crate::error::Paper2NotionError;
use crate::prompts::TITLE_PROMPT;
use serde::{Deserialize, Serialize};

/// How a resolved section is typed, both in the reply and in Notion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    /// The page title. Exactly one per registry.
    Title,
    /// Free text; a `rich_text` property and/or body content.
    RichText,
    /// Comma/semicolon separated labels; a `multi_select` property.
    TagList,
}

impl SectionKind {
    /// Notion property type name used when creating database columns.
    pub fn notion_type(self) -> &'static str {
        match self {
            SectionKind::Title => "title",
            SectionKind::RichText => "rich_text",
            SectionKind::TagList => "multi_select",
        }
    }
}

/// One required output field of the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSpec {
    /// Unique key, heading text and Notion property name.
    pub name: String,
    /// Generation instruction placed under the heading in prompts.
    pub instruction: String,
    pub kind: SectionKind,
    /// Must resolve for the run to succeed (and is fetched in concise mode).
    pub required: bool,
    /// Resolved in its own round before the bulk request.
    pub process_first: bool,
    /// Becomes a typed database property in addition to any body content.
    pub database_property: bool,
}

impl SectionSpec {
    /// A plain-text section with all flags off.
    pub fn rich_text(name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instruction: instruction.into(),
            kind: SectionKind::RichText,
            required: false,
            process_first: false,
            database_property: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn database_property(mut self) -> Self {
        self.database_property = true;
        self
    }

    pub fn kind(mut self, kind: SectionKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Ordered, validated list of [`SectionSpec`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRegistry {
    specs: Vec<SectionSpec>,
}

impl SectionRegistry {
    /// Build a registry, enforcing its invariants:
    ///
    /// - names are unique and non-empty
    /// - exactly one section has [`SectionKind::Title`], and it is both
    ///   `required` and `process_first`
    /// - no other section is `process_first`
    pub fn new(specs: Vec<SectionSpec>) -> Result<Self, Paper2NotionError> {
        let mut titles = 0;
        for (i, spec) in specs.iter().enumerate() {
            let name = spec.name.trim();
            if name.is_empty() || name != spec.name || name.contains('\n') {
                return Err(Paper2NotionError::InvalidConfig(format!(
                    "section #{} has an empty or untrimmed name: {:?}",
                    i + 1,
                    spec.name
                )));
            }
            if specs[..i].iter().any(|s| s.name == spec.name) {
                return Err(Paper2NotionError::InvalidConfig(format!(
                    "duplicate section name '{}'",
                    spec.name
                )));
            }
            match spec.kind {
                SectionKind::Title => {
                    titles += 1;
                    if !spec.required || !spec.process_first {
                        return Err(Paper2NotionError::InvalidConfig(format!(
                            "title section '{}' must be required and processed first",
                            spec.name
                        )));
                    }
                }
                _ if spec.process_first => {
                    return Err(Paper2NotionError::InvalidConfig(format!(
                        "only the title section may be processed first, got '{}'",
                        spec.name
                    )));
                }
                _ => {}
            }
        }
        if titles != 1 {
            return Err(Paper2NotionError::InvalidConfig(format!(
                "registry must contain exactly one title section, found {titles}"
            )));
        }
        Ok(Self { specs })
    }

    /// All sections in registry order.
    pub fn specs(&self) -> &[SectionSpec] {
        &self.specs
    }

    pub fn get(&self, name: &str) -> Option<&SectionSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// The single title section.
    pub fn title(&self) -> &SectionSpec {
        // `new` guarantees exactly one.
        self.specs
            .iter()
            .find(|s| s.kind == SectionKind::Title)
            .unwrap_or(&self.specs[0])
    }

    /// Whether `name` is a tag-list section.
    pub fn is_tag_list(&self, name: &str) -> bool {
        self.get(name).is_some_and(|s| s.kind == SectionKind::TagList)
    }

    /// Sections to request after the title resolves, in registry order.
    ///
    /// `Detailed` asks for everything; `Concise` only for required sections.
    /// The title is never included.
    pub fn needed(&self, mode: SummaryMode) -> Vec<&SectionSpec> {
        self.specs
            .iter()
            .filter(|s| s.kind != SectionKind::Title)
            .filter(|s| mode == SummaryMode::Detailed || s.required)
            .collect()
    }

    /// Sections that become typed database columns.
    pub fn database_properties(&self) -> impl Iterator<Item = &SectionSpec> {
        self.specs.iter().filter(|s| s.database_property)
    }
}

impl Default for SectionRegistry {
    fn default() -> Self {
        // The built-in list satisfies every invariant checked by `new`.
        Self {
            specs: default_specs(),
        }
    }
}

/// Name of the title section in the built-in registry.
pub const TITLE_SECTION: &str = "Name";

/// Name of the keyword section in the built-in registry.
pub const KEYWORDS_SECTION: &str = "Keywords";

/// The built-in paper-reading registry.
pub fn default_specs() -> Vec<SectionSpec> {
    vec![
        SectionSpec {
            name: TITLE_SECTION.into(),
            instruction: TITLE_PROMPT.into(),
            kind: SectionKind::Title,
            required: true,
            process_first: true,
            database_property: true,
        },
        SectionSpec::rich_text(
            "どんな研究？",
            "この研究は何を目的とし、どのような成果を上げたのか",
        )
        .required()
        .database_property(),
        SectionSpec::rich_text(
            "新規性は？",
            "既存研究と比較して、どのような新しい点があるのか",
        ),
        SectionSpec::rich_text("手法のキモは？", "提案手法の核となる技術や考え方")
            .required()
            .database_property(),
        SectionSpec::rich_text("検証方法は？", "実験や評価方法、結果の概要").required(),
        SectionSpec::rich_text(
            "課題は？",
            "研究の限界や今後の課題として挙げられている点",
        )
        .required(),
        SectionSpec::rich_text(
            "次に読む論文等は？",
            "関連研究や次に読むべき論文を以下の形式で列挙して。タイトル（可能ならリンク）。\
             レスポンスはリストやjsonではなくあくまでテキストでお願いします。",
        )
        .required()
        .database_property(),
        SectionSpec::rich_text(
            KEYWORDS_SECTION,
            "List 3-5 important technical keywords from the paper in English. \
             Use commas to separate keywords. \
             Example: deep learning, computer vision, neural networks",
        )
        .kind(SectionKind::TagList)
        .required()
        .database_property(),
        SectionSpec::rich_text("研究の目的と背景", PURPOSE_AND_BACKGROUND),
        SectionSpec::rich_text("論文内にある全ての図表の説明", FIGURES_AND_TABLES),
        SectionSpec::rich_text("論文内で結果の解釈や考察", INTERPRETATION),
        SectionSpec::rich_text("提案手法の新規性と既存研究との差異", NOVELTY),
        SectionSpec::rich_text("論文内の数式と手法の関連", EQUATIONS),
        SectionSpec::rich_text("研究の限界や課題に関する要約", LIMITATIONS),
        SectionSpec::rich_text("論文内で将来の展望や示唆に関する要約", FUTURE_WORK),
    ]
}

const PURPOSE_AND_BACKGROUND: &str = "研究の目的と背景を2000文字以上でまとめてください。
<purpose> 本研究の目的について、以下の観点を踏まえて詳細に説明してください:
- 研究で解決しようとしている問題や達成しようとしている目標
- 研究の意義や重要性
- 研究の新規性や独自性 </purpose>
<background> 本研究の背景について、以下の観点を踏まえて詳細に説明してください:
- 研究分野の現状と課題
- 関連する先行研究とその限界や問題点
- 本研究の位置づけ </background>
<note> 論文の内容に忠実に、論文に書かれていない情報や著者の意図を超えた解釈は避けてください。\
論文から直接引用する場合は引用部分を明示し、専門用語には説明を加えてください。 </note>";

const FIGURES_AND_TABLES: &str = "論文内にある全ての図表の説明を1500文字以上でまとめてください。
<figures_and_tables> 論文内に含まれる図表の種類と数を明記してください:
- 図（図解、グラフ、画像など）: [数]
- 表: [数] </figures_and_tables>
<content_and_purpose> 各図表が表現しているデータや情報の概要、研究のどの部分（方法、結果、考察など）に関連しているか、\
著者が伝えたい主要なメッセージを説明してください。 </content_and_purpose>
<components_and_symbols> 軸ラベル、凡例、色分け、記号や略語の意味、グラフの種類を説明してください。 </components_and_symbols>
<key_results> 図表から読み取れる重要な結果、傾向、異常値、そして結論との関係を要約してください。 </key_results>
<note> 論文に掲載されている図表のみを扱い、説明は論文の記述に基づいて行ってください。 </note>";

const INTERPRETATION: &str = "論文内で結果の解釈や考察がどのようにまとめられているかを3000文字以上でまとめてください。
<structure> 解釈や考察が論文のどの部分で行われているか、その流れと論理構成、著者が強調している点を説明してください。 </structure>
<interpretations> 各結果が持つ意味、研究の目的や仮説との関係、先行研究の知見との関係についての著者の解釈を詳細に説明してください。 </interpretations>
<arguments> 著者が結果から導き出した主要な主張、新しい知見、今後の研究の方向性を明確に述べてください。 </arguments>
<validity> 解釈を裏付けるエビデンスの強さ、仮定や前提条件、解釈の限界を議論してください。 </validity>
<note> 論文に明示的に書かれている解釈や考察のみを扱い、必ず論文から直接引用して引用部分を明示してください。 </note>";

const NOVELTY: &str = "提案手法の新規性と既存研究との差異を1500文字以上でまとめてください。
<key_contributions> 提案手法の中核をなすアイデアや技術、独自性や有効性を裏付ける要素を明確にしてください。 </key_contributions>
<related_work_comparison> 提案手法と関連研究の共通点、相違点、改善点を詳細に比較してください。 </related_work_comparison>
<novelty_superiority> 提案手法が解決する既存研究の問題点や限界、もたらす新しい洞察を具体的に説明してください。 </novelty_superiority>
<effectiveness> 提案手法の有効性を実験結果や評価指標に基づいて説明してください。 </effectiveness>
<info_availability> 詳細な情報が記載されていない場合は「論文中に提案手法の新規性や既存研究との差異の詳細な情報が見当たりません。」と記載してください。 </info_availability>
<note> 必ず論文から直接引用してください。引用部分を明示してください。 </note>";

const EQUATIONS: &str = "論文内の数式と手法の関連を2500文字以上でまとめてください。
<equations> 各数式の意味や役割、手法のどの部分に対応しているか、パラメータや変数が何を表しているかを詳細に説明してください。 </equations>
<derivation> 各数式の導出過程、前提条件や仮定、理論的根拠、適用範囲を説明してください。 </derivation>
<impact> 数式のパラメータ設定や変更が手法の性能や改善にどう影響するかを考察してください。 </impact>
<note> 論文に明示的に書かれている数式と手法の関連性のみを扱ってください。\
数式はLaTeX形式で出力し、必ず$${数式}$$という形式で$${と}$$で囲んでください。 </note>";

const LIMITATIONS: &str = "論文内で研究の限界や課題がどのようにまとめられているかを2000文字以上でまとめてください。
<limitations> 方法論、データ、解析手法、結果の一般化、適用範囲における限界を詳細に報告してください。 </limitations>
<challenges> 解決できなかった問題、必要な追加の研究課題、方法論や理論的枠組みの改善点を報告してください。 </challenges>
<implications> 限界や課題が研究の結論や貢献にどう影響するか、著者の見解を要約してください。 </implications>
<note> 論文に明示的に書かれている限界や課題のみを扱い、必ず論文から直接引用してください。 </note>";

const FUTURE_WORK: &str = "論文内で将来の展望や示唆がどのようにまとめられているかを2000文字以上でまとめてください。
<future_directions> 具体的な研究課題や方法論、新たな仮説、他分野への応用可能性を詳細に報告してください。 </future_directions>
<practical_implications> 研究結果の実社会での活用、具体的な応用例や提言、社会的意義を報告してください。 </practical_implications>
<author_views> 著者が重要視している発展の可能性、独自の視点、長期的な目標を明確に述べてください。 </author_views>
<note> 論文に明示的に書かれている将来の展望や示唆のみを扱い、必ず論文から直接引用してください。 </note>";
