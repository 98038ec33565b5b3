//! HTML标签提取器
//! 基于 html5ever 流式分词，一次遍历提取 a-href、form、script-src、meta 和 title

use std::cell::{Cell, RefCell};
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts
};
use markup5ever::interface::Attribute;
use tendril::StrTendril;

/// 解析出的表单
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedForm {
    /// method 属性原值（未设置时为 None）
    pub method: Option<String>,
    /// action 属性原值（未设置时为 None）
    pub action: Option<String>,
    /// 字段名与默认值（文档顺序）
    pub fields: Vec<(String, String)>,
}

/// 页面提取结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageDocument {
    pub anchors: Vec<String>,
    pub forms: Vec<ParsedForm>,
    pub script_srcs: Vec<String>,
    /// 其它标签的 href/src（link、img、iframe 等）
    pub resources: Vec<String>,
    /// (小写name, content)
    pub meta_tags: Vec<(String, String)>,
    pub title: Option<String>,
}

impl PageDocument {
    pub fn meta_content(&self, name: &str) -> Option<&str> {
        self.meta_tags
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c.as_str())
    }
}

#[derive(Debug, Default)]
struct SelectState {
    name: String,
    value: Option<String>,
    in_option: bool,
}

/// 分词回调（内部可变状态）
#[derive(Debug, Default)]
struct DocumentSink {
    document: RefCell<PageDocument>,
    current_form: RefCell<Option<ParsedForm>>,
    current_select: RefCell<Option<SelectState>>,
    in_title: Cell<bool>,
}

impl TokenSink for DocumentSink {
    type Handle = ();

    fn process_token(&self, token: Token, _line: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => match tag.kind {
                TagKind::StartTag => {
                    self.start_tag(&tag);
                    // 独立分词器不会自动切换状态，原始文本元素的内容不能当作标签解析
                    if let Some(kind) = raw_text_kind(&tag) {
                        return TokenSinkResult::RawData(kind);
                    }
                }
                TagKind::EndTag => self.end_tag(&tag),
            },
            Token::CharacterTokens(text) => self.characters(&text),
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

impl DocumentSink {
    fn start_tag(&self, tag: &Tag) {
        let attrs = &tag.attrs;
        let name = tag.name.as_ref();
        if name != "a" {
            if let Some(href) = attr_value(attrs, "href") {
                self.document.borrow_mut().resources.push(href);
            }
        }
        if name != "script" {
            if let Some(src) = attr_value(attrs, "src") {
                self.document.borrow_mut().resources.push(src);
            }
        }

        match name {
            "a" => {
                if let Some(href) = attr_value(attrs, "href") {
                    self.document.borrow_mut().anchors.push(href);
                }
            }
            "form" => {
                // 表单不允许嵌套，遇到新的 form 先结束旧的
                self.finish_form();
                *self.current_form.borrow_mut() = Some(ParsedForm {
                    method: attr_value(attrs, "method"),
                    action: attr_value(attrs, "action"),
                    fields: Vec::new(),
                });
            }
            "input" => {
                if let Some(form) = self.current_form.borrow_mut().as_mut() {
                    if let Some(name) = attr_value(attrs, "name") {
                        let value = attr_value(attrs, "value").unwrap_or_default();
                        form.fields.push((name, value));
                    }
                }
            }
            "select" => {
                self.finish_select();
                if self.current_form.borrow().is_some() {
                    if let Some(name) = attr_value(attrs, "name") {
                        *self.current_select.borrow_mut() = Some(SelectState {
                            name,
                            ..SelectState::default()
                        });
                    }
                }
            }
            "option" => {
                if let Some(select) = self.current_select.borrow_mut().as_mut() {
                    // 只取第一个 option 的文本
                    if select.value.is_none() {
                        select.value = Some(String::new());
                        select.in_option = true;
                    } else {
                        select.in_option = false;
                    }
                }
            }
            "script" => {
                if let Some(src) = attr_value(attrs, "src") {
                    self.document.borrow_mut().script_srcs.push(src);
                }
            }
            "meta" => {
                let name = attr_value(attrs, "name");
                let content = attr_value(attrs, "content");
                if let (Some(n), Some(c)) = (name, content) {
                    self.document.borrow_mut().meta_tags.push((n.to_lowercase(), c));
                }
            }
            "title" => self.in_title.set(true),
            _ => {}
        }
    }

    fn end_tag(&self, tag: &Tag) {
        match tag.name.as_ref() {
            "form" => self.finish_form(),
            "select" => self.finish_select(),
            "option" => {
                if let Some(select) = self.current_select.borrow_mut().as_mut() {
                    select.in_option = false;
                }
            }
            "title" => self.in_title.set(false),
            _ => {}
        }
    }

    fn characters(&self, text: &StrTendril) {
        if self.in_title.get() {
            let mut document = self.document.borrow_mut();
            document.title.get_or_insert_with(String::new).push_str(text);
        }
        if let Some(select) = self.current_select.borrow_mut().as_mut() {
            if select.in_option {
                if let Some(value) = select.value.as_mut() {
                    value.push_str(text);
                }
            }
        }
    }

    fn finish_select(&self) {
        let Some(select) = self.current_select.borrow_mut().take() else {
            return;
        };
        if let Some(form) = self.current_form.borrow_mut().as_mut() {
            let value = select.value.map(|v| v.trim().to_string()).unwrap_or_default();
            form.fields.push((select.name, value));
        }
    }

    fn finish_form(&self) {
        self.finish_select();
        if let Some(form) = self.current_form.borrow_mut().take() {
            self.document.borrow_mut().forms.push(form);
        }
    }

    fn into_document(self) -> PageDocument {
        // 处理未闭合的 select / form
        self.finish_form();
        let mut document = self.document.into_inner();
        document.title = document
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        document
    }
}

fn raw_text_kind(tag: &Tag) -> Option<RawKind> {
    match tag.name.as_ref() {
        "script" => Some(RawKind::ScriptData),
        "style" | "xmp" | "iframe" | "noembed" | "noframes" => Some(RawKind::Rawtext),
        "title" | "textarea" => Some(RawKind::Rcdata),
        _ => None,
    }
}

fn attr_value(attrs: &[Attribute], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|attr| attr.name.local.as_ref() == name)
        .map(|attr| attr.value.to_string())
}

/// HTML提取器
pub struct HtmlExtractor;

impl HtmlExtractor {
    /// 从HTML字符串提取标签
    pub fn extract(html: &str) -> PageDocument {
        let tokenizer = Tokenizer::new(DocumentSink::default(), TokenizerOpts::default());
        let queue = BufferQueue::default();
        queue.push_back(StrTendril::from(html));

        let _ = tokenizer.feed(&queue);
        tokenizer.end();

        tokenizer.sink.into_document()
    }
}
